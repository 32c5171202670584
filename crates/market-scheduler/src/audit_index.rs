//! Incrementally populated index of audit candidates.
//!
//! Archived rounds feed their regular pairs in once, at archive time.
//! Selection walks the index round-robin from a cursor, so consecutive
//! rounds re-show different pairs and a lookup never rescans history.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

use market_ledger::{AuditSource, Pair, PostId};

/// A settled regular pair that can be re-shown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditCandidate {
    /// Provenance carried onto the audit pair.
    pub source: AuditSource,
    /// Left post of the source pair.
    pub post_left: PostId,
    /// Right post of the source pair.
    pub post_right: PostId,
}

impl AuditCandidate {
    /// Builds a candidate from a settled pair.
    pub fn from_pair(pair: &Pair) -> Self {
        Self {
            source: pair.as_audit_source(),
            post_left: pair.post_left.clone(),
            post_right: pair.post_right.clone(),
        }
    }
}

/// Bounded FIFO of audit candidates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditIndex {
    entries: VecDeque<AuditCandidate>,
    capacity: usize,
    cursor: usize,
}

impl AuditIndex {
    /// Creates an index holding at most `capacity` candidates (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
            cursor: 0,
        }
    }

    /// Adds the regular pairs of a settled round. Golden-set and audit
    /// pairs are skipped. Returns the number added.
    pub fn record_round(&mut self, pairs: &[Pair]) -> usize {
        let mut added = 0;
        for pair in pairs.iter().filter(|p| !p.is_golden_set && !p.is_audit_pair) {
            self.push(AuditCandidate::from_pair(pair));
            added += 1;
        }
        debug!(added, size = self.entries.len(), "audit index updated");
        added
    }

    fn push(&mut self, candidate: AuditCandidate) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
            self.cursor = self.cursor.saturating_sub(1);
        }
        self.entries.push_back(candidate);
    }

    /// Takes up to `n` candidates, continuing from where the previous
    /// selection stopped. Never returns the same candidate twice in one
    /// call.
    pub fn select(&mut self, n: usize) -> Vec<AuditCandidate> {
        let len = self.entries.len();
        if len == 0 {
            return Vec::new();
        }
        let take = n.min(len);
        let start = self.cursor % len;
        let picked = (0..take)
            .map(|offset| self.entries[(start + offset) % len].clone())
            .collect();
        self.cursor = (start + take) % len;
        picked
    }

    /// Candidates currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no candidate is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum candidates held.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for AuditIndex {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use market_ledger::Vote;

    fn regular(i: usize) -> Pair {
        let mut pair = Pair::new(format!("pair_0_{i}"), format!("l{i}"), format!("r{i}"));
        pair.add_vote("c1", Vote::Left).unwrap();
        pair
    }

    #[test]
    fn test_skips_calibration_pairs() {
        let mut index = AuditIndex::new(10);
        let golden = Pair::golden("g", "a", "b", Vote::Left);
        let audit = Pair::audit("a", regular(9).as_audit_source(), "a", "b");
        let added = index.record_round(&[golden, audit, regular(0)]);
        assert_eq!(added, 1);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut index = AuditIndex::new(3);
        let pairs: Vec<Pair> = (0..5).map(regular).collect();
        index.record_round(&pairs);
        assert_eq!(index.len(), 3);
        let ids: Vec<String> = index.select(3).into_iter().map(|c| c.source.pair_id).collect();
        assert_eq!(ids, vec!["pair_0_2", "pair_0_3", "pair_0_4"]);
    }

    #[test]
    fn test_round_robin_selection() {
        let mut index = AuditIndex::new(10);
        index.record_round(&(0..3).map(regular).collect::<Vec<_>>());
        let first: Vec<String> = index.select(2).into_iter().map(|c| c.source.pair_id).collect();
        let second: Vec<String> = index.select(2).into_iter().map(|c| c.source.pair_id).collect();
        assert_eq!(first, vec!["pair_0_0", "pair_0_1"]);
        assert_eq!(second, vec!["pair_0_2", "pair_0_0"]);
    }

    #[test]
    fn test_select_bounded_by_size() {
        let mut index = AuditIndex::new(10);
        assert!(index.select(4).is_empty());
        index.record_round(&[regular(0)]);
        assert_eq!(index.select(4).len(), 1);
    }

    #[test]
    fn test_candidate_carries_votes() {
        let candidate = AuditCandidate::from_pair(&regular(1));
        assert_eq!(candidate.source.prior_votes.get("c1"), Some(&Vote::Left));
        assert_eq!(candidate.post_left, "l1");
    }
}
