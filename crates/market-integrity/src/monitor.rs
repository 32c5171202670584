//! # Integrity Monitor
//!
//! Converts each round's calibration pairs into per-curator verdicts.
//!
//! ## Scoring
//!
//! For curator `c` with windowed golden accuracy `g` and audit consistency
//! `a`:
//!
//! ```text
//! score = (golden_weight·g + audit_weight·a) / (golden_weight + audit_weight)
//! ```
//!
//! A signal with no observations in the window drops out and the other one
//! carries the full weight. With no observations at all the score is
//! `initial_score`.
//!
//! ## Enforcement
//!
//! | Condition | Effect |
//! |-----------|--------|
//! | score < `suspend_threshold` | suspended: reward multiplier 0 |
//! | score < `slash_threshold` and scored this round | slash `stake × slash_rate` |
//!
//! Both require at least `min_observations` scored events in the window.
//! Suspension is re-evaluated every round, so a curator whose windowed
//! score recovers is reinstated.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use market_ledger::{Curator, CuratorId, Pair};

use crate::error::{IntegrityError, Result};
use crate::score::IntegrityScore;
use crate::window::{ObservationWindow, RoundObservation};

/// Integrity monitor configuration.
///
/// # Example
///
/// ```rust
/// use market_integrity::IntegrityConfig;
///
/// let config = IntegrityConfig::new()
///     .with_window_rounds(5)
///     .with_thresholds(0.6, 0.4);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrityConfig {
    /// Rounds kept in each curator's window.
    pub window_rounds: usize,
    /// Weight of golden-set accuracy.
    pub golden_weight: f64,
    /// Weight of audit consistency.
    pub audit_weight: f64,
    /// Score of a curator with no observations.
    pub initial_score: f64,
    /// Suspend below this score.
    pub suspend_threshold: f64,
    /// Slash below this score.
    pub slash_threshold: f64,
    /// Fraction of stake slashed per offending round.
    pub slash_rate: f64,
    /// Score at or above which the full multiplier applies.
    pub high_confidence_threshold: f64,
    /// Multiplier for high-confidence curators.
    pub full_multiplier: f64,
    /// Multiplier for everyone else who is not suspended.
    pub reduced_multiplier: f64,
    /// Scored events needed in the window before enforcement.
    pub min_observations: u32,
}

impl IntegrityConfig {
    /// Creates a config with default values.
    ///
    /// Defaults:
    /// - Window: 10 rounds
    /// - Weights: golden 0.6, audit 0.4
    /// - Initial score: 1.0
    /// - Suspend below 0.5, slash 5% of stake below 0.3
    /// - Full multiplier (1.0) at 0.8 and above, otherwise 0.5
    /// - Enforcement after 3 scored events
    #[must_use]
    pub const fn new() -> Self {
        Self {
            window_rounds: 10,
            golden_weight: 0.6,
            audit_weight: 0.4,
            initial_score: 1.0,
            suspend_threshold: 0.5,
            slash_threshold: 0.3,
            slash_rate: 0.05,
            high_confidence_threshold: 0.8,
            full_multiplier: 1.0,
            reduced_multiplier: 0.5,
            min_observations: 3,
        }
    }

    /// Sets the window length in rounds.
    #[must_use]
    pub const fn with_window_rounds(mut self, rounds: usize) -> Self {
        self.window_rounds = rounds;
        self
    }

    /// Sets the signal weights.
    #[must_use]
    pub const fn with_weights(mut self, golden: f64, audit: f64) -> Self {
        self.golden_weight = golden;
        self.audit_weight = audit;
        self
    }

    /// Sets the suspension and slashing thresholds.
    #[must_use]
    pub const fn with_thresholds(mut self, suspend: f64, slash: f64) -> Self {
        self.suspend_threshold = suspend;
        self.slash_threshold = slash;
        self
    }

    /// Sets the slash rate.
    #[must_use]
    pub const fn with_slash_rate(mut self, rate: f64) -> Self {
        self.slash_rate = rate;
        self
    }

    /// Sets the multiplier tiers.
    #[must_use]
    pub const fn with_multipliers(mut self, high_confidence: f64, full: f64, reduced: f64) -> Self {
        self.high_confidence_threshold = high_confidence;
        self.full_multiplier = full;
        self.reduced_multiplier = reduced;
        self
    }

    /// Sets the minimum observations before enforcement.
    #[must_use]
    pub const fn with_min_observations(mut self, n: u32) -> Self {
        self.min_observations = n;
        self
    }

    /// Checks ranges and orderings.
    ///
    /// # Errors
    ///
    /// [`IntegrityError::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.window_rounds == 0 {
            return Err(IntegrityError::invalid("window_rounds", "must be at least 1"));
        }
        for (field, value) in [
            ("golden_weight", self.golden_weight),
            ("audit_weight", self.audit_weight),
            ("reduced_multiplier", self.reduced_multiplier),
            ("full_multiplier", self.full_multiplier),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(IntegrityError::invalid(field, format!("must be a non-negative number, got {value}")));
            }
        }
        if self.golden_weight + self.audit_weight <= 0.0 {
            return Err(IntegrityError::invalid("golden_weight", "weights must not both be zero"));
        }
        for (field, value) in [
            ("initial_score", self.initial_score),
            ("suspend_threshold", self.suspend_threshold),
            ("slash_threshold", self.slash_threshold),
            ("slash_rate", self.slash_rate),
            ("high_confidence_threshold", self.high_confidence_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(IntegrityError::invalid(field, format!("must be within [0, 1], got {value}")));
            }
        }
        if self.slash_threshold > self.suspend_threshold {
            return Err(IntegrityError::invalid("slash_threshold", "must not exceed suspend_threshold"));
        }
        if self.reduced_multiplier > self.full_multiplier {
            return Err(IntegrityError::invalid("reduced_multiplier", "must not exceed full_multiplier"));
        }
        Ok(())
    }
}

impl Default for IntegrityConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of one round for one curator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntegrityVerdict {
    /// Windowed integrity score.
    pub score: f64,
    /// Rewards withheld this round.
    pub should_suspend: bool,
    /// Stake to slash. Zero when not slashing.
    pub slash_amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CuratorRecord {
    window: ObservationWindow,
    score: IntegrityScore,
    suspended: bool,
}

/// Per-curator integrity state.
#[derive(Debug, Clone)]
pub struct IntegrityMonitor {
    config: IntegrityConfig,
    records: BTreeMap<CuratorId, CuratorRecord>,
}

impl IntegrityMonitor {
    /// Creates a monitor.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails [`IntegrityConfig::validate`].
    pub fn new(config: IntegrityConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            records: BTreeMap::new(),
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &IntegrityConfig {
        &self.config
    }

    /// Scores one round's pairs for every curator in `curators`.
    ///
    /// Only golden-set and audit pairs contribute. `NoReveal` votes, and
    /// audit pairs where either exposure was unrevealed, are not scored.
    /// Every listed curator gets a verdict and a window entry, even if it
    /// is empty.
    pub fn process_round_metrics(
        &mut self,
        pairs: &[Pair],
        curators: &[Curator],
    ) -> BTreeMap<CuratorId, IntegrityVerdict> {
        let mut observations: BTreeMap<&str, RoundObservation> = curators
            .iter()
            .map(|c| (c.id.as_str(), RoundObservation::default()))
            .collect();

        for pair in pairs.iter().filter(|p| p.is_golden_set || p.is_audit_pair) {
            for (curator_id, vote) in pair.votes() {
                if !vote.is_revealed() {
                    continue;
                }
                let Some(obs) = observations.get_mut(curator_id.as_str()) else {
                    continue;
                };
                if pair.is_golden_set {
                    if let Some(answer) = pair.golden_correct_answer {
                        obs.record_golden(*vote == answer);
                    }
                } else if let Some(source) = &pair.audit_source {
                    if let Some(prior) = source.prior_votes.get(curator_id).filter(|v| v.is_revealed()) {
                        obs.record_audit(vote == prior);
                    }
                }
            }
        }

        let mut verdicts = BTreeMap::new();
        for curator in curators {
            let observation = observations
                .get(curator.id.as_str())
                .copied()
                .unwrap_or_default();
            let verdict = self.apply_observation(curator, observation);
            verdicts.insert(curator.id.clone(), verdict);
        }
        verdicts
    }

    fn apply_observation(&mut self, curator: &Curator, observation: RoundObservation) -> IntegrityVerdict {
        let config = &self.config;
        let record = self
            .records
            .entry(curator.id.clone())
            .or_insert_with(|| CuratorRecord {
                window: ObservationWindow::new(config.window_rounds),
                score: IntegrityScore::new(config.initial_score),
                suspended: false,
            });

        record.window.push(observation);
        record.score = windowed_score(config, record.window.totals());

        let enforce = record.window.totals().events() >= config.min_observations;
        let was_suspended = record.suspended;
        record.suspended = enforce && record.score.is_below(config.suspend_threshold);

        let slash_amount = if enforce && !observation.is_empty() && record.score.is_below(config.slash_threshold) {
            curator.stake * config.slash_rate
        } else {
            0.0
        };

        if record.suspended && !was_suspended {
            warn!(curator = %curator.id, score = %record.score, "curator suspended");
        } else if was_suspended && !record.suspended {
            info!(curator = %curator.id, score = %record.score, "curator reinstated");
        }
        if slash_amount > 0.0 {
            warn!(curator = %curator.id, slash_amount, "integrity slash");
        }
        debug!(curator = %curator.id, score = record.score.value(), events = observation.events(), "integrity updated");

        IntegrityVerdict {
            score: record.score.value(),
            should_suspend: record.suspended,
            slash_amount,
        }
    }

    /// Reward multiplier for a curator: 0 when suspended, otherwise the
    /// full or reduced tier by score. Unknown curators are treated as
    /// unsuspended at `initial_score`.
    pub fn determine_reward_multiplier(&self, curator_id: &str) -> f64 {
        let (score, suspended) = match self.records.get(curator_id) {
            Some(record) => (record.score, record.suspended),
            None => (IntegrityScore::new(self.config.initial_score), false),
        };
        if suspended {
            0.0
        } else if score.value() >= self.config.high_confidence_threshold {
            self.config.full_multiplier
        } else {
            self.config.reduced_multiplier
        }
    }

    /// Current score of a curator, if it has been scored.
    pub fn score_of(&self, curator_id: &str) -> Option<IntegrityScore> {
        self.records.get(curator_id).map(|r| r.score)
    }

    /// Returns true if the curator is currently suspended.
    pub fn is_suspended(&self, curator_id: &str) -> bool {
        self.records.get(curator_id).is_some_and(|r| r.suspended)
    }

    /// The curator's observation window, if it has been scored.
    pub fn window_of(&self, curator_id: &str) -> Option<&ObservationWindow> {
        self.records.get(curator_id).map(|r| &r.window)
    }

    /// Current scores of every tracked curator.
    pub fn scores(&self) -> BTreeMap<CuratorId, f64> {
        self.records
            .iter()
            .map(|(id, r)| (id.clone(), r.score.value()))
            .collect()
    }
}

fn windowed_score(config: &IntegrityConfig, totals: &RoundObservation) -> IntegrityScore {
    let parts = [
        (config.golden_weight, totals.golden_accuracy()),
        (config.audit_weight, totals.audit_consistency()),
    ];
    let (weighted, weight) = parts
        .iter()
        .filter_map(|(w, value)| value.map(|v| (w * v, *w)))
        .fold((0.0, 0.0), |(acc, total), (wv, w)| (acc + wv, total + w));

    if weight > 0.0 {
        IntegrityScore::new(weighted / weight)
    } else if totals.is_empty() {
        IntegrityScore::new(config.initial_score)
    } else {
        // Only zero-weighted signals observed.
        IntegrityScore::new(totals.golden_accuracy().or(totals.audit_consistency()).unwrap_or(config.initial_score))
    }
}
