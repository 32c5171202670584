//! # Market Strategy
//!
//! Implementations of the vote capability the settlement engine consumes,
//! plus the demand-side reader models that drive subscriber counts.
//!
//! ## Strategies
//!
//! | Strategy | Behavior |
//! |----------|----------|
//! | Honest | picks the higher-rated post 70–80% of the time |
//! | Random | coin flip |
//! | Lazy | always LEFT |
//! | AiBot | like Honest at 65–75% |
//! | Whale | like Honest, staked at 50x |
//! | Coordinated | one shared decision per ballot for every group member |
//!
//! "Correct" means the post with the higher current rating. Equal ratings
//! have no correct side and resolve to a coin flip.
//!
//! ## Example
//!
//! ```rust
//! use market_ledger::{Curator, Post, Vote};
//! use market_strategy::{Ballot, Strategy, StrategyBook, VoteSource};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut book = StrategyBook::new();
//! book.assign("lazy", Strategy::Lazy)?;
//!
//! let (left, right) = (Post::new("a", ""), Post::new("b", ""));
//! let ballot = Ballot::new(0, 0, &left, &right);
//! let mut rng = StdRng::seed_from_u64(1);
//!
//! let vote = book.vote(&ballot, &Curator::new("lazy", 10.0), &mut rng)?;
//! assert_eq!(vote, Vote::Left);
//! # Ok::<(), market_strategy::StrategyError>(())
//! ```

mod book;
mod error;
mod group;
mod readers;
mod strategy;

pub use book::StrategyBook;
pub use error::{Result, StrategyError};
pub use group::{CoordinatedGroup, GroupId, GroupKind};
pub use readers::{feed_quality, Reader, ReaderPool};
pub use strategy::{Ballot, Strategy, VoteSource, WHALE_STAKE_MULTIPLIER};
