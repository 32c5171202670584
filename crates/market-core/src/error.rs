//! Error types for the settlement engine.

use thiserror::Error;

/// Core error type for market operations.
#[derive(Debug, Error)]
pub enum MarketError {
    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A pair refers to a post the engine does not hold.
    #[error("Unknown post: {0}")]
    UnknownPost(String),

    /// A curator id is not registered with the engine.
    #[error("Unknown curator: {0}")]
    UnknownCurator(String),

    /// The round was settled before.
    #[error("Round {0} has already been settled")]
    AlreadySettled(u64),

    /// Ledger error passthrough.
    #[error("Ledger error: {0}")]
    Ledger(#[from] market_ledger::LedgerError),

    /// Pool error passthrough.
    #[error("Pool error: {0}")]
    Pool(#[from] market_pool::PoolError),

    /// Strategy error passthrough.
    #[error("Strategy error: {0}")]
    Strategy(#[from] market_strategy::StrategyError),

    /// Rating error passthrough.
    #[error("Rating error: {0}")]
    Rating(#[from] market_rating::RatingError),

    /// Integrity error passthrough.
    #[error("Integrity error: {0}")]
    Integrity(#[from] market_integrity::IntegrityError),

    /// Scheduler error passthrough.
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] market_scheduler::SchedulerError),

    /// Reading a config or scenario file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failed.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
