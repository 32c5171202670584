//! # Vote Ledger
//!
//! Records of the comparisons curators are asked to make and the votes
//! they cast. Every other market crate builds on these types.
//!
//! ## Overview
//!
//! A [`Round`] owns a list of [`Pair`]s. Each pair compares two [`Post`]s
//! and collects at most one [`Vote`] per curator (last write wins). Once
//! settlement begins the pairs are frozen and the round becomes an
//! immutable history record.
//!
//! ```text
//! Round ──┬── Pair(left, right) ── { curator → Vote }
//!         ├── Pair(golden, answer)
//!         └── Pair(audit, source votes)
//! ```
//!
//! ## Partitions
//!
//! | Partition | Definition |
//! |-----------|------------|
//! | Majority  | Side with strictly more votes |
//! | Minority  | Curators on the other side |
//! | No-reveal | No vote recorded, or explicit [`Vote::NoReveal`] |
//!
//! A tie leaves the majority undefined; settlement skips rating and reward
//! effects for that pair.
//!
//! ## Usage
//!
//! ```rust
//! use market_ledger::{Pair, Vote};
//!
//! let mut pair = Pair::new("pair_0_0", "post_a", "post_b");
//! pair.add_vote("alice", Vote::Left)?;
//! pair.add_vote("bob", Vote::Left)?;
//! pair.add_vote("carol", Vote::Right)?;
//!
//! assert_eq!(pair.majority_vote(), Some(Vote::Left));
//! assert_eq!(pair.minority_voters(), vec!["carol".to_string()]);
//! # Ok::<(), market_ledger::LedgerError>(())
//! ```

pub mod error;
pub mod models;
pub mod pair;
pub mod round;
pub mod vote;

pub use error::{LedgerError, Result};
pub use models::{Curator, CuratorId, PairId, Post, PostId, DEFAULT_RATING};
pub use pair::{AuditSource, Pair, VoteTally};
pub use round::{Round, RoundPhase};
pub use vote::Vote;
