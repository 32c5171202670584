//! # Market Core
//!
//! Round settlement engine for the curation market.
//! Orchestrates the Pair Scheduler, Rating System, Integrity Monitor and
//! Reward Pool.
//!
//! ## Round Flow
//!
//! | Phase | Component | Effect |
//! |-------|-----------|--------|
//! | Pairing | Pair Scheduler | demand-gated random pairs |
//! | Calibration | Pair Scheduler | golden-set and audit slots |
//! | Voting | Vote sources | one vote per curator per pair |
//! | Settlement | Rating, Integrity, Pool | ratings, scores, slashing, rewards |
//! | Archived | Audit index | pairs become audit sources |
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       MARKET CORE                               │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │                    ┌─────────────────┐                          │
//! │                    │   Settlement    │  ← Single Writer         │
//! │                    │     Engine      │                          │
//! │                    └────────┬────────┘                          │
//! │                             │                                   │
//! │      ┌──────────────┬───────┴───────┬──────────────┐            │
//! │      ▼              ▼               ▼              ▼            │
//! │ ┌──────────┐  ┌──────────┐   ┌───────────┐  ┌──────────┐        │
//! │ │   Pair   │  │  Rating  │   │ Integrity │  │  Reward  │        │
//! │ │Scheduler │  │  System  │   │  Monitor  │  │   Pool   │        │
//! │ └──────────┘  └──────────┘   └───────────┘  └──────────┘        │
//! │                                                                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use market_core::{Curator, MarketConfig, Post, SettlementEngine, Vote};
//!
//! let mut engine = SettlementEngine::new(MarketConfig::default().with_seed(42))?;
//! for id in ["alice", "bob", "carol"] {
//!     engine.add_curator(Curator::new(id, 500.0));
//! }
//! engine.add_post(Post::new("a", "first"));
//! engine.add_post(Post::new("b", "second"));
//! engine.pool_mut().add_subscription(1_000.0)?;
//!
//! let mut round = engine.open_round(10, &[])?;
//! let pair_id = round.pairs()[0].id.clone();
//! round.record_vote(&pair_id, "alice", Vote::Left)?;
//! round.record_vote(&pair_id, "bob", Vote::Left)?;
//! round.record_vote(&pair_id, "carol", Vote::Right)?;
//!
//! let report = engine.settle_round(&mut round)?;
//! assert_eq!(report.decided_pairs, 1);
//! assert!(report.result("carol").unwrap().rewards < report.result("alice").unwrap().rewards);
//! # Ok::<(), market_core::MarketError>(())
//! ```
//!
//! ## Guarantees
//!
//! - The pool balance never goes negative; a short pool scales every
//!   reward by the same factor
//! - A round settles at most once, and nothing is committed unless the
//!   whole settlement can be
//! - The same seed and inputs produce the same report digest

mod config;
pub mod digest;
mod engine;
mod error;
mod settlement;
mod snapshot;

pub use config::{MarketConfig, PayoutConfig};
pub use engine::{EventHook, SettlementEngine};
pub use error::MarketError;
pub use settlement::{CuratorSettlement, RoundReport, Shortfall};
pub use snapshot::MarketSnapshot;

// Re-export component types for convenience
pub use market_integrity::{IntegrityConfig, IntegrityMonitor, IntegrityScore};
pub use market_ledger::{Curator, CuratorId, Pair, Post, PostId, Round, RoundPhase, Vote};
pub use market_pool::{PoolConfig, PoolStats, RewardPool};
pub use market_rating::{RatingConfig, RatingSystem, StakeDampening};
pub use market_scheduler::{GoldenCandidate, PairScheduler, SchedulerConfig};
pub use market_strategy::{
    Ballot, CoordinatedGroup, GroupKind, Reader, ReaderPool, Strategy, StrategyBook, VoteSource,
};

/// Core result type for market operations.
pub type Result<T> = std::result::Result<T, MarketError>;
