//! # Market Scheduler
//!
//! Builds the pair list for a round in three steps:
//!
//! 1. **Demand gating**: cap the pair count by content and subscribers
//! 2. **Generation**: one random matching of the market's posts
//! 3. **Calibration**: overwrite leading slots with golden-set pairs, then
//!    the next slots with audit pairs drawn from an [`AuditIndex`]
//!
//! ```text
//! slot:  0 .. golden_count .. golden_count + audit_count .. len
//!        [   golden set   ][        audit pairs        ][ regular ]
//! ```
//!
//! Slots that cannot be filled (too few candidates) keep their regular
//! pair. Running short is never an error.

mod audit_index;
mod error;
mod scheduler;

pub use audit_index::{AuditCandidate, AuditIndex};
pub use error::{Result, SchedulerError};
pub use scheduler::{GoldenCandidate, PairScheduler, SchedulerConfig};
