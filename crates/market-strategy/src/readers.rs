//! Demand-side readers.
//!
//! Readers never vote. Their only effect is the subscriber count that
//! gates how many pairs a round may schedule.

use serde::{Deserialize, Serialize};
use tracing::info;

/// Perceived feed quality for an average post rating, in `[0, 1]`.
///
/// A feed at `base` rating reads as 0.6; every 500 points above or below
/// moves quality by 1.0.
///
/// ```rust
/// use market_strategy::feed_quality;
///
/// assert_eq!(feed_quality(1500.0, 1500.0), 0.6);
/// assert_eq!(feed_quality(1750.0, 1500.0), 1.0);
/// assert!((feed_quality(1400.0, 1500.0) - 0.4).abs() < 1e-12);
/// ```
pub fn feed_quality(avg_rating: f64, base: f64) -> f64 {
    if avg_rating >= base {
        ((avg_rating - base) / 500.0 + 0.6).min(1.0)
    } else {
        (0.6 - (base - avg_rating) / 500.0).max(0.0)
    }
}

/// A subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reader {
    /// Stays subscribed regardless of quality.
    FreeRider,
    /// Leaves for good the first round quality drops below `threshold`.
    Churning {
        /// Minimum acceptable feed quality.
        #[serde(default = "default_churn_threshold")]
        threshold: f64,
        /// Round the reader left in, if it has.
        #[serde(default)]
        churned_at: Option<u64>,
    },
}

fn default_churn_threshold() -> f64 {
    0.6
}

impl Reader {
    /// A churning reader that has not left yet.
    pub fn churning(threshold: f64) -> Self {
        Reader::Churning {
            threshold,
            churned_at: None,
        }
    }

    /// Returns true while the reader is subscribed.
    pub fn is_active(&self) -> bool {
        match self {
            Reader::FreeRider => true,
            Reader::Churning { churned_at, .. } => churned_at.is_none(),
        }
    }

    /// Evaluates the feed for `round`. Returns true if the reader left in
    /// this call.
    pub fn observe(&mut self, avg_rating: f64, base: f64, round: u64) -> bool {
        match self {
            Reader::FreeRider => false,
            Reader::Churning {
                threshold,
                churned_at,
            } => {
                if churned_at.is_some() {
                    return false;
                }
                if feed_quality(avg_rating, base) < *threshold {
                    *churned_at = Some(round);
                    true
                } else {
                    false
                }
            }
        }
    }
}

/// All readers of a market.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReaderPool {
    readers: Vec<(String, Reader)>,
}

impl ReaderPool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a reader.
    pub fn add(&mut self, id: impl Into<String>, reader: Reader) {
        self.readers.push((id.into(), reader));
    }

    /// Lets every reader judge the feed. Returns how many left this round.
    pub fn observe_round(&mut self, avg_rating: f64, base: f64, round: u64) -> usize {
        let churned = self
            .readers
            .iter_mut()
            .filter(|(_, reader)| reader.is_active())
            .map(|(_, reader)| reader.observe(avg_rating, base, round))
            .filter(|left| *left)
            .count();
        if churned > 0 {
            info!(round, churned, remaining = self.active_subscribers(), "readers churned");
        }
        churned
    }

    /// Readers still subscribed.
    pub fn active_subscribers(&self) -> usize {
        self.readers.iter().filter(|(_, r)| r.is_active()).count()
    }

    /// Readers that have left.
    pub fn churned(&self) -> usize {
        self.readers.len() - self.active_subscribers()
    }

    /// Total readers ever added.
    pub fn len(&self) -> usize {
        self.readers.len()
    }

    /// Returns true when no reader was added.
    pub fn is_empty(&self) -> bool {
        self.readers.is_empty()
    }
}
