//! Error types for the rating system.

use thiserror::Error;

/// Result type alias for rating operations.
pub type Result<T> = std::result::Result<T, RatingError>;

/// Errors raised by the rating system.
#[derive(Debug, Error)]
pub enum RatingError {
    /// A configuration value is out of range.
    #[error("invalid rating config: {field} {reason}")]
    InvalidConfig {
        /// Offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}
