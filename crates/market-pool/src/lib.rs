//! # Reward Pool
//!
//! Custody of the shared fund that pays curators. Subscriptions flow in,
//! rewards flow out, and recaptured value (slashed stake, minority
//! shortfall) flows back in.
//!
//! ## Invariants
//!
//! - The balance is never negative
//! - Every debit is bounded by the current balance
//! - Negative or non-finite amounts are rejected on every operation
//! - Each inflow source has its own counter for audit
//!
//! ## Quick Start
//!
//! ```rust
//! use market_pool::RewardPool;
//!
//! let mut pool = RewardPool::new(100_000.0);
//! pool.add_subscription(2_000.0)?;
//! assert_eq!(pool.balance(), 102_000.0);
//!
//! // Overdrafts are refused and leave the balance untouched.
//! assert!(pool.withdraw(500_000.0).is_err());
//! assert_eq!(pool.balance(), 102_000.0);
//! # Ok::<(), market_pool::PoolError>(())
//! ```

mod error;
mod pool;

pub use error::{PoolError, Result};
pub use pool::{PoolConfig, PoolStats, RewardPool, Withdrawal};
