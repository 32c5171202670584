//! Read-only view of engine state for export.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use market_ledger::{Curator, CuratorId, Post};
use market_pool::PoolStats;

/// Point-in-time copy of posts, curators, pool and integrity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Rounds settled so far.
    pub rounds_settled: usize,
    /// Posts in id order.
    pub posts: Vec<Post>,
    /// Curators in id order.
    pub curators: Vec<Curator>,
    /// Pool counters.
    pub pool: PoolStats,
    /// Integrity score per scored curator.
    pub integrity_scores: BTreeMap<CuratorId, f64>,
}

impl MarketSnapshot {
    /// Mean post rating, or `None` without posts.
    pub fn average_post_rating(&self) -> Option<f64> {
        if self.posts.is_empty() {
            return None;
        }
        Some(self.posts.iter().map(|p| p.rating).sum::<f64>() / self.posts.len() as f64)
    }

    /// Sum of curator stakes.
    pub fn total_stake(&self) -> f64 {
        self.curators.iter().map(|c| c.stake).sum()
    }
}
