//! Posts and curators.

use serde::{Deserialize, Serialize};

/// Baseline rating for new posts and curators.
pub const DEFAULT_RATING: f64 = 1500.0;

/// Identifier of a post.
pub type PostId = String;
/// Identifier of a curator.
pub type CuratorId = String;
/// Identifier of a pair.
pub type PairId = String;

/// A piece of content competing in pairwise comparisons.
///
/// The rating is only ever changed by the rating system; posts are never
/// removed once added to a market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Unique post identifier.
    pub id: PostId,
    /// Opaque payload shown to curators.
    pub content: String,
    /// Relative quality rating.
    pub rating: f64,
}

impl Post {
    /// Creates a post at the default rating.
    pub fn new(id: impl Into<PostId>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            rating: DEFAULT_RATING,
        }
    }

    /// Creates a post with an explicit starting rating.
    pub fn with_rating(id: impl Into<PostId>, content: impl Into<String>, rating: f64) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            rating,
        }
    }
}

/// A staked participant who votes on pairs.
///
/// Calibration state lives in the integrity monitor, keyed by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Curator {
    /// Unique curator identifier.
    pub id: CuratorId,
    /// Stake at risk. Never negative.
    pub stake: f64,
    /// Curator rating, moved by vote alignment.
    pub rating: f64,
}

impl Curator {
    /// Creates a curator at the default rating. Negative or non-finite
    /// stakes are stored as zero.
    pub fn new(id: impl Into<CuratorId>, stake: f64) -> Self {
        Self {
            id: id.into(),
            stake: sanitize_stake(stake),
            rating: DEFAULT_RATING,
        }
    }

    /// Removes up to `amount` from the stake and returns what was actually
    /// taken. The stake never drops below zero.
    pub fn slash(&mut self, amount: f64) -> f64 {
        if !amount.is_finite() || amount <= 0.0 {
            return 0.0;
        }
        let taken = amount.min(self.stake);
        self.stake -= taken;
        taken
    }
}

fn sanitize_stake(stake: f64) -> f64 {
    if stake.is_finite() && stake > 0.0 {
        stake
    } else {
        0.0
    }
}
