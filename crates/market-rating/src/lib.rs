//! # Market Rating
//!
//! Pairwise-comparison ratings for posts and curators.
//!
//! Every decided pair moves its two posts by the same amount in opposite
//! directions. Curators are rated against a fixed reference opponent: a
//! majority-aligned vote is a win, anything else a loss.
//!
//! The step size grows with the total stake behind a round, but slowly:
//! see [`StakeDampening`].
//!
//! ```rust
//! use market_ledger::Post;
//! use market_rating::RatingSystem;
//!
//! let rating = RatingSystem::default();
//! assert_eq!(rating.effective_k(0.0), 32.0);
//! let mut a = Post::new("a", "");
//! let mut b = Post::new("b", "");
//! let delta = rating.update_post_ratings(&mut a, &mut b, 0.0);
//! assert_eq!(a.rating - 1500.0, delta);
//! assert_eq!(1500.0 - b.rating, delta);
//! ```

mod elo;
mod error;

pub use elo::{expected_score, RatingConfig, RatingSystem, StakeDampening};
pub use error::{RatingError, Result};
