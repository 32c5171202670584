//! Pair generation and calibration injection.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use market_ledger::{Pair, PostId, Vote};

use crate::audit_index::AuditIndex;
use crate::error::{Result, SchedulerError};

/// Scheduler configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Pairs allowed per subscriber (`K` in the demand gate).
    pub demand_multiplier: f64,
    /// Share of slots given to golden-set pairs.
    pub golden_pct: f64,
    /// Share of slots given to audit pairs.
    pub audit_pct: f64,
    /// Maximum candidates kept in the audit index.
    pub audit_index_capacity: usize,
}

impl SchedulerConfig {
    /// Creates a config with default values.
    ///
    /// Defaults:
    /// - Demand multiplier: 1.0
    /// - Golden set: 10% of slots
    /// - Audit: 5% of slots
    /// - Audit index: 1024 candidates
    #[must_use]
    pub const fn new() -> Self {
        Self {
            demand_multiplier: 1.0,
            golden_pct: 0.10,
            audit_pct: 0.05,
            audit_index_capacity: 1024,
        }
    }

    /// Sets the demand multiplier.
    #[must_use]
    pub const fn with_demand_multiplier(mut self, k: f64) -> Self {
        self.demand_multiplier = k;
        self
    }

    /// Sets the golden-set and audit shares.
    #[must_use]
    pub const fn with_calibration(mut self, golden_pct: f64, audit_pct: f64) -> Self {
        self.golden_pct = golden_pct;
        self.audit_pct = audit_pct;
        self
    }

    /// Sets the audit index capacity.
    #[must_use]
    pub const fn with_audit_index_capacity(mut self, capacity: usize) -> Self {
        self.audit_index_capacity = capacity;
        self
    }

    /// Checks ranges.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::InvalidConfig`] for a negative multiplier, a share
    /// outside `[0, 1]`, shares summing past 1, or a zero index capacity.
    pub fn validate(&self) -> Result<()> {
        if !self.demand_multiplier.is_finite() || self.demand_multiplier < 0.0 {
            return Err(invalid("demand_multiplier", format!("must be a non-negative number, got {}", self.demand_multiplier)));
        }
        for (field, value) in [("golden_pct", self.golden_pct), ("audit_pct", self.audit_pct)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(field, format!("must be within [0, 1], got {value}")));
            }
        }
        if self.golden_pct + self.audit_pct > 1.0 {
            return Err(invalid("audit_pct", "golden_pct + audit_pct must not exceed 1"));
        }
        if self.audit_index_capacity == 0 {
            return Err(invalid("audit_index_capacity", "must be at least 1"));
        }
        Ok(())
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> SchedulerError {
    SchedulerError::InvalidConfig {
        field,
        reason: reason.into(),
    }
}

/// A curated comparison with a known answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldenCandidate {
    /// Left post.
    pub left: PostId,
    /// Right post.
    pub right: PostId,
    /// Correct side. `NoReveal` candidates are never injected.
    pub answer: Vote,
}

impl GoldenCandidate {
    /// Creates a candidate.
    pub fn new(left: impl Into<PostId>, right: impl Into<PostId>, answer: Vote) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
            answer,
        }
    }
}

/// Builds each round's pair list.
#[derive(Debug, Clone, Default)]
pub struct PairScheduler {
    config: SchedulerConfig,
}

impl PairScheduler {
    /// Creates a scheduler.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails [`SchedulerConfig::validate`].
    pub fn new(config: SchedulerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// `min(⌊unique_posts / 2⌋, ⌊subscribers · K⌋)`.
    ///
    /// ```rust
    /// use market_scheduler::PairScheduler;
    ///
    /// let scheduler = PairScheduler::default();
    /// assert_eq!(scheduler.demand_gated_count(21, 400), 10);
    /// assert_eq!(scheduler.demand_gated_count(21, 3), 3);
    /// assert_eq!(scheduler.demand_gated_count(0, 400), 0);
    /// ```
    pub fn demand_gated_count(&self, unique_posts: usize, subscribers: usize) -> usize {
        let content_cap = unique_posts / 2;
        let demand = (subscribers as f64 * self.config.demand_multiplier).floor();
        let demand_cap = if demand.is_finite() && demand > 0.0 {
            demand as usize
        } else {
            0
        };
        content_cap.min(demand_cap)
    }

    /// Golden-set slots for a round of `len` pairs.
    pub fn golden_count(&self, len: usize) -> usize {
        share(len, self.config.golden_pct)
    }

    /// Audit slots for a round of `len` pairs.
    pub fn audit_count(&self, len: usize) -> usize {
        share(len, self.config.audit_pct)
    }

    /// Shuffles `posts` and pairs them off consecutively, stopping at
    /// `count` pairs. Posts left over sit this round out.
    pub fn generate_pairs<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        posts: &[PostId],
        count: usize,
        round_id: u64,
    ) -> Vec<Pair> {
        if posts.len() < 2 || count == 0 {
            return Vec::new();
        }
        let mut shuffled = posts.to_vec();
        shuffled.shuffle(rng);
        let pairs: Vec<Pair> = shuffled
            .chunks_exact(2)
            .take(count)
            .enumerate()
            .map(|(i, chunk)| Pair::new(format!("pair_{round_id}_{i}"), chunk[0].clone(), chunk[1].clone()))
            .collect();
        debug!(round_id, requested = count, generated = pairs.len(), "pairs generated");
        pairs
    }

    /// Overwrites the leading slots with golden-set pairs sampled from
    /// `candidates`. Returns the number of slots filled.
    pub fn inject_golden_set<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        pairs: &mut [Pair],
        candidates: &[GoldenCandidate],
        round_id: u64,
    ) -> usize {
        let usable: Vec<&GoldenCandidate> = candidates.iter().filter(|c| c.answer.is_revealed()).collect();
        let slots = self.golden_count(pairs.len()).min(usable.len());
        for (i, candidate) in usable.choose_multiple(rng, slots).enumerate() {
            pairs[i] = Pair::golden(
                format!("golden_{round_id}_{i}"),
                candidate.left.clone(),
                candidate.right.clone(),
                candidate.answer,
            );
        }
        slots
    }

    /// Overwrites the slots following the golden set with audit pairs from
    /// `index`. Returns the number of slots filled.
    pub fn inject_audit_pairs(&self, pairs: &mut [Pair], index: &mut AuditIndex, round_id: u64) -> usize {
        let start = self.golden_count(pairs.len());
        let wanted = self.audit_count(pairs.len()).min(pairs.len().saturating_sub(start));
        let picked = index.select(wanted);
        for (i, candidate) in picked.iter().enumerate() {
            let slot = start + i;
            pairs[slot] = Pair::audit(
                format!("audit_{round_id}_{slot}"),
                candidate.source.clone(),
                candidate.post_left.clone(),
                candidate.post_right.clone(),
            );
        }
        picked.len()
    }
}

fn share(len: usize, pct: f64) -> usize {
    let slots = (len as f64 * pct).floor();
    if slots.is_finite() && slots > 0.0 {
        (slots as usize).min(len)
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn posts(n: usize) -> Vec<PostId> {
        (0..n).map(|i| format!("post_{i}")).collect()
    }

    #[test]
    fn test_demand_gate_bounds() {
        let scheduler = PairScheduler::default();
        for u in 0..30 {
            for s in 0..30 {
                let n = scheduler.demand_gated_count(u, s);
                assert!(n <= u / 2);
                assert_eq!(n, (u / 2).min(s));
            }
        }
    }

    #[test]
    fn test_demand_multiplier_scales() {
        let scheduler = PairScheduler::new(SchedulerConfig::new().with_demand_multiplier(0.25)).unwrap();
        assert_eq!(scheduler.demand_gated_count(1000, 10), 2);
        assert_eq!(scheduler.demand_gated_count(1000, 3), 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(SchedulerConfig::new().with_calibration(0.7, 0.5).validate().is_err());
        assert!(SchedulerConfig::new().with_calibration(-0.1, 0.0).validate().is_err());
        assert!(SchedulerConfig::new().with_demand_multiplier(f64::NAN).validate().is_err());
        assert!(PairScheduler::new(SchedulerConfig::new().with_audit_index_capacity(0)).is_err());
    }

    #[test]
    fn test_generate_pairs_partitions_without_repeats() {
        let scheduler = PairScheduler::default();
        let mut rng = StdRng::seed_from_u64(7);
        let pairs = scheduler.generate_pairs(&mut rng, &posts(11), 100, 3);
        assert_eq!(pairs.len(), 5);
        let mut seen: Vec<&str> = pairs
            .iter()
            .flat_map(|p| [p.post_left.as_str(), p.post_right.as_str()])
            .collect();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 10);
        assert_eq!(pairs[4].id, "pair_3_4");
    }

    #[test]
    fn test_generate_pairs_degenerate_inputs() {
        let scheduler = PairScheduler::default();
        let mut rng = StdRng::seed_from_u64(7);
        assert!(scheduler.generate_pairs(&mut rng, &posts(1), 5, 0).is_empty());
        assert!(scheduler.generate_pairs(&mut rng, &posts(10), 0, 0).is_empty());
        assert_eq!(scheduler.generate_pairs(&mut rng, &posts(10), 2, 0).len(), 2);
    }

    #[test]
    fn test_generate_pairs_seeded_determinism() {
        let scheduler = PairScheduler::default();
        let a = scheduler.generate_pairs(&mut StdRng::seed_from_u64(42), &posts(40), 20, 0);
        let b = scheduler.generate_pairs(&mut StdRng::seed_from_u64(42), &posts(40), 20, 0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_golden_injection_count() {
        let scheduler = PairScheduler::default();
        let mut rng = StdRng::seed_from_u64(1);
        let mut pairs = scheduler.generate_pairs(&mut rng, &posts(60), 30, 0);
        let candidates: Vec<GoldenCandidate> = (0..10)
            .map(|i| GoldenCandidate::new(format!("gl{i}"), format!("gr{i}"), Vote::Right))
            .collect();
        let filled = scheduler.inject_golden_set(&mut rng, &mut pairs, &candidates, 0);
        assert_eq!(filled, 3);
        assert!(pairs[..3].iter().all(|p| p.is_golden_set));
        assert!(!pairs[3].is_golden_set);
    }

    #[test]
    fn test_golden_injection_limited_by_candidates() {
        let scheduler = PairScheduler::default();
        let mut rng = StdRng::seed_from_u64(1);
        let mut pairs = scheduler.generate_pairs(&mut rng, &posts(100), 50, 0);
        let candidates = vec![
            GoldenCandidate::new("a", "b", Vote::Left),
            GoldenCandidate::new("c", "d", Vote::NoReveal),
        ];
        assert_eq!(scheduler.inject_golden_set(&mut rng, &mut pairs, &candidates, 0), 1);
        assert!(pairs[0].is_golden_set);
        assert!(!pairs[1].is_golden_set);
    }

    #[test]
    fn test_audit_slots_follow_golden_without_overlap() {
        let scheduler = PairScheduler::default();
        let mut rng = StdRng::seed_from_u64(9);
        let mut index = AuditIndex::new(64);
        index.record_round(&scheduler.generate_pairs(&mut rng, &posts(40), 20, 0));

        let mut pairs = scheduler.generate_pairs(&mut rng, &posts(80), 40, 1);
        let candidates: Vec<GoldenCandidate> = (0..8)
            .map(|i| GoldenCandidate::new(format!("gl{i}"), format!("gr{i}"), Vote::Left))
            .collect();
        let golden = scheduler.inject_golden_set(&mut rng, &mut pairs, &candidates, 1);
        let audit = scheduler.inject_audit_pairs(&mut pairs, &mut index, 1);

        assert_eq!(golden, 4);
        assert_eq!(audit, 2);
        assert!(pairs[..4].iter().all(|p| p.is_golden_set && !p.is_audit_pair));
        assert!(pairs[4..6].iter().all(|p| p.is_audit_pair && !p.is_golden_set));
        assert!(pairs[6..].iter().all(|p| !p.is_audit_pair && !p.is_golden_set));
    }

    #[test]
    fn test_audit_starts_at_golden_count_even_without_golden() {
        let scheduler = PairScheduler::default();
        let mut rng = StdRng::seed_from_u64(9);
        let mut index = AuditIndex::new(64);
        index.record_round(&scheduler.generate_pairs(&mut rng, &posts(40), 20, 0));

        let mut pairs = scheduler.generate_pairs(&mut rng, &posts(80), 40, 1);
        let audit = scheduler.inject_audit_pairs(&mut pairs, &mut index, 1);
        assert_eq!(audit, 2);
        assert!(pairs[4].is_audit_pair && pairs[5].is_audit_pair);
        assert!(pairs[..4].iter().all(|p| !p.is_audit_pair));
    }

    #[test]
    fn test_audit_with_empty_history() {
        let scheduler = PairScheduler::default();
        let mut rng = StdRng::seed_from_u64(2);
        let mut pairs = scheduler.generate_pairs(&mut rng, &posts(80), 40, 0);
        let mut index = AuditIndex::default();
        assert_eq!(scheduler.inject_audit_pairs(&mut pairs, &mut index, 0), 0);
        assert!(pairs.iter().all(|p| !p.is_audit_pair));
    }

    #[test]
    fn test_config_serialization() {
        let config = SchedulerConfig::new().with_calibration(0.2, 0.1).with_demand_multiplier(0.5);
        let json = serde_json::to_string(&config).unwrap();
        let parsed: SchedulerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);

        let partial: SchedulerConfig = serde_json::from_str(r#"{"golden_pct": 0.3}"#).unwrap();
        assert_eq!(partial.golden_pct, 0.3);
        assert_eq!(partial.audit_index_capacity, SchedulerConfig::default().audit_index_capacity);
    }

    #[test]
    fn test_golden_candidate_from_json() {
        let candidate: GoldenCandidate =
            serde_json::from_str(r#"{"left": "a", "right": "b", "answer": "Right"}"#).unwrap();
        assert_eq!(candidate, GoldenCandidate::new("a", "b", Vote::Right));
    }
}
