//! # Market Integrity
//!
//! Scores every curator on two signals drawn from calibration pairs:
//!
//! - **Golden-set accuracy**: agreement with a pair's known answer
//! - **Audit consistency**: agreement with the curator's own earlier vote
//!   on the pair an audit re-shows
//!
//! Observations are kept per curator in a rolling window of recent rounds.
//! The windowed score drives suspension, stake slashing and the reward
//! multiplier settlement applies.
//!
//! ## Example
//!
//! ```rust
//! use market_integrity::{IntegrityConfig, IntegrityMonitor};
//! use market_ledger::{Curator, Pair, Vote};
//!
//! let mut monitor = IntegrityMonitor::new(IntegrityConfig::default())?;
//! let curators = vec![Curator::new("c1", 100.0)];
//!
//! let mut golden = Pair::golden("golden_0_0", "a", "b", Vote::Left);
//! golden.add_vote("c1", Vote::Left)?;
//!
//! let verdicts = monitor.process_round_metrics(&[golden], &curators);
//! assert_eq!(verdicts["c1"].score, 1.0);
//! assert_eq!(monitor.determine_reward_multiplier("c1"), 1.0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod monitor;
mod score;
mod window;

pub use error::{IntegrityError, Result};
pub use monitor::{IntegrityConfig, IntegrityMonitor, IntegrityVerdict};
pub use score::IntegrityScore;
pub use window::{ObservationWindow, RoundObservation};
