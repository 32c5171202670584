//! # Observation Window
//!
//! Per-curator rolling record of calibration outcomes.
//!
//! Each settled round contributes one [`RoundObservation`]. Once the window
//! holds `capacity` rounds, pushing a new one evicts the oldest. Running
//! totals are adjusted on every push and eviction, so reading the windowed
//! totals never rescans history.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Calibration outcomes for one curator in one round.
///
/// Only revealed votes are counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundObservation {
    /// Golden-set pairs voted on.
    pub golden_total: u32,
    /// Golden-set pairs matching the known answer.
    pub golden_correct: u32,
    /// Audit pairs where both exposures were revealed.
    pub audit_total: u32,
    /// Audit pairs where both exposures agree.
    pub audit_consistent: u32,
}

impl RoundObservation {
    /// Records one golden-set outcome.
    pub fn record_golden(&mut self, correct: bool) {
        self.golden_total += 1;
        if correct {
            self.golden_correct += 1;
        }
    }

    /// Records one audit outcome.
    pub fn record_audit(&mut self, consistent: bool) {
        self.audit_total += 1;
        if consistent {
            self.audit_consistent += 1;
        }
    }

    /// Number of scored events.
    pub fn events(&self) -> u32 {
        self.golden_total + self.audit_total
    }

    /// Returns true if nothing was scored.
    pub fn is_empty(&self) -> bool {
        self.events() == 0
    }

    /// Share of golden-set pairs answered correctly.
    pub fn golden_accuracy(&self) -> Option<f64> {
        ratio(self.golden_correct, self.golden_total)
    }

    /// Share of audit pairs answered consistently.
    pub fn audit_consistency(&self) -> Option<f64> {
        ratio(self.audit_consistent, self.audit_total)
    }

    fn add(&mut self, other: &RoundObservation) {
        self.golden_total += other.golden_total;
        self.golden_correct += other.golden_correct;
        self.audit_total += other.audit_total;
        self.audit_consistent += other.audit_consistent;
    }

    fn subtract(&mut self, other: &RoundObservation) {
        self.golden_total = self.golden_total.saturating_sub(other.golden_total);
        self.golden_correct = self.golden_correct.saturating_sub(other.golden_correct);
        self.audit_total = self.audit_total.saturating_sub(other.audit_total);
        self.audit_consistent = self.audit_consistent.saturating_sub(other.audit_consistent);
    }
}

fn ratio(hits: u32, total: u32) -> Option<f64> {
    (total > 0).then(|| f64::from(hits) / f64::from(total))
}

/// Bounded window of the most recent rounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationWindow {
    rounds: VecDeque<RoundObservation>,
    capacity: usize,
    totals: RoundObservation,
}

impl ObservationWindow {
    /// Creates an empty window holding at most `capacity` rounds (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            rounds: VecDeque::with_capacity(capacity),
            capacity,
            totals: RoundObservation::default(),
        }
    }

    /// Appends a round, evicting and returning the oldest if full.
    pub fn push(&mut self, observation: RoundObservation) -> Option<RoundObservation> {
        let evicted = if self.rounds.len() == self.capacity {
            self.rounds.pop_front()
        } else {
            None
        };
        if let Some(old) = &evicted {
            self.totals.subtract(old);
        }
        self.totals.add(&observation);
        self.rounds.push_back(observation);
        evicted
    }

    /// Sum over the rounds in the window.
    #[inline]
    #[must_use]
    pub fn totals(&self) -> &RoundObservation {
        &self.totals
    }

    /// Most recent round, if any.
    #[must_use]
    pub fn latest(&self) -> Option<&RoundObservation> {
        self.rounds.back()
    }

    /// Rounds currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    /// Returns true if no round has been pushed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    /// Maximum rounds held.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(golden: (u32, u32), audit: (u32, u32)) -> RoundObservation {
        RoundObservation {
            golden_total: golden.0,
            golden_correct: golden.1,
            audit_total: audit.0,
            audit_consistent: audit.1,
        }
    }

    #[test]
    fn test_record_and_ratios() {
        let mut o = RoundObservation::default();
        assert!(o.is_empty());
        o.record_golden(true);
        o.record_golden(false);
        o.record_audit(true);
        assert_eq!(o.events(), 3);
        assert_eq!(o.golden_accuracy(), Some(0.5));
        assert_eq!(o.audit_consistency(), Some(1.0));
        assert_eq!(RoundObservation::default().golden_accuracy(), None);
    }

    #[test]
    fn test_eviction_keeps_totals_in_sync() {
        let mut window = ObservationWindow::new(2);
        assert!(window.push(obs((2, 2), (0, 0))).is_none());
        assert!(window.push(obs((1, 0), (1, 1))).is_none());
        assert_eq!(window.totals().golden_total, 3);

        let evicted = window.push(obs((0, 0), (2, 0))).unwrap();
        assert_eq!(evicted.golden_total, 2);
        assert_eq!(window.len(), 2);
        assert_eq!(*window.totals(), obs((1, 0), (3, 1)));
    }

    #[test]
    fn test_zero_capacity_is_one() {
        let mut window = ObservationWindow::new(0);
        window.push(obs((1, 1), (0, 0)));
        window.push(obs((1, 0), (0, 0)));
        assert_eq!(window.capacity(), 1);
        assert_eq!(window.totals().golden_correct, 0);
        assert_eq!(window.latest(), Some(&obs((1, 0), (0, 0))));
    }
}
