//! Error types for the reward pool.

use thiserror::Error;

/// Result type alias for pool operations.
pub type Result<T> = std::result::Result<T, PoolError>;

/// Errors that can occur on pool operations.
///
/// A failed operation never changes pool state.
#[derive(Debug, Error)]
pub enum PoolError {
    /// A withdrawal asked for more than the pool holds.
    #[error("insufficient pool balance: requested {requested:.4}, available {available:.4}")]
    InsufficientBalance {
        /// Amount requested.
        requested: f64,
        /// Balance at the time of the request.
        available: f64,
    },

    /// The amount was negative, NaN or infinite.
    #[error("invalid amount {amount} for {operation}")]
    InvalidAmount {
        /// Operation that was refused.
        operation: &'static str,
        /// Offending amount.
        amount: f64,
    },
}
