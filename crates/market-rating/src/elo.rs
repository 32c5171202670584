//! Elo-style updates with a stake-dependent K-factor.

use serde::{Deserialize, Serialize};
use tracing::trace;

use market_ledger::{Curator, Post, DEFAULT_RATING};

use crate::error::{RatingError, Result};

/// How total round stake scales the K-factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StakeDampening {
    /// Stake has no effect.
    None,
    /// `d(s) = min(1 + ln(1 + s / stake_scale), max_multiplier)`.
    Logarithmic {
        /// Stake at which the multiplier reaches `1 + ln 2`.
        stake_scale: f64,
        /// Upper bound on the multiplier.
        max_multiplier: f64,
    },
}

impl StakeDampening {
    /// Multiplier applied to the base K-factor for `total_stake`.
    ///
    /// Non-decreasing in stake, never below 1. Negative or non-finite
    /// stake counts as zero.
    pub fn multiplier(&self, total_stake: f64) -> f64 {
        match *self {
            StakeDampening::None => 1.0,
            StakeDampening::Logarithmic {
                stake_scale,
                max_multiplier,
            } => {
                if stake_scale <= 0.0 || !stake_scale.is_finite() {
                    return 1.0;
                }
                let stake = if total_stake.is_finite() {
                    total_stake.max(0.0)
                } else {
                    0.0
                };
                (1.0 + (stake / stake_scale).ln_1p()).min(max_multiplier.max(1.0))
            }
        }
    }
}

impl Default for StakeDampening {
    fn default() -> Self {
        StakeDampening::Logarithmic {
            stake_scale: 10_000.0,
            max_multiplier: 2.0,
        }
    }
}

/// Rating system configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingConfig {
    /// K-factor before stake dampening.
    pub base_k: f64,
    /// Rating of the implicit opponent curators are rated against.
    pub reference_rating: f64,
    /// Stake dampening curve.
    pub dampening: StakeDampening,
}

impl RatingConfig {
    /// Creates a config with default values.
    ///
    /// Defaults:
    /// - Base K: 32
    /// - Reference rating: 1500
    /// - Dampening: logarithmic, scale 10 000, capped at 2x
    #[must_use]
    pub fn new() -> Self {
        Self {
            base_k: 32.0,
            reference_rating: DEFAULT_RATING,
            dampening: StakeDampening::default(),
        }
    }

    /// Sets the base K-factor.
    #[must_use]
    pub const fn with_base_k(mut self, k: f64) -> Self {
        self.base_k = k;
        self
    }

    /// Sets the curator reference rating.
    #[must_use]
    pub const fn with_reference_rating(mut self, rating: f64) -> Self {
        self.reference_rating = rating;
        self
    }

    /// Sets the dampening curve.
    #[must_use]
    pub const fn with_dampening(mut self, dampening: StakeDampening) -> Self {
        self.dampening = dampening;
        self
    }

    /// Checks that every value yields finite ratings.
    ///
    /// # Errors
    ///
    /// [`RatingError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        if !self.base_k.is_finite() || self.base_k < 0.0 {
            return Err(invalid("base_k", format!("must be a non-negative number, got {}", self.base_k)));
        }
        if !self.reference_rating.is_finite() {
            return Err(invalid(
                "reference_rating",
                format!("must be finite, got {}", self.reference_rating),
            ));
        }
        if let StakeDampening::Logarithmic {
            stake_scale,
            max_multiplier,
        } = self.dampening
        {
            if !stake_scale.is_finite() || stake_scale <= 0.0 {
                return Err(invalid("dampening.stake_scale", format!("must be positive, got {stake_scale}")));
            }
            if !max_multiplier.is_finite() || max_multiplier < 1.0 {
                return Err(invalid(
                    "dampening.max_multiplier",
                    format!("must be at least 1, got {max_multiplier}"),
                ));
            }
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> RatingError {
    RatingError::InvalidConfig {
        field,
        reason: reason.into(),
    }
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Probability that a player rated `rating` beats one rated `opponent`.
pub fn expected_score(rating: f64, opponent: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((opponent - rating) / 400.0))
}

/// Applies rating updates for decided pairs.
#[derive(Debug, Clone, Default)]
pub struct RatingSystem {
    config: RatingConfig,
}

impl RatingSystem {
    /// Creates a rating system.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails [`RatingConfig::validate`].
    pub fn new(config: RatingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &RatingConfig {
        &self.config
    }

    /// K-factor after stake dampening.
    pub fn effective_k(&self, total_stake: f64) -> f64 {
        self.config.base_k * self.config.dampening.multiplier(total_stake)
    }

    /// Moves `winner` up and `loser` down by the same amount.
    ///
    /// Returns the delta applied.
    pub fn update_post_ratings(&self, winner: &mut Post, loser: &mut Post, total_stake: f64) -> f64 {
        let expected = expected_score(winner.rating, loser.rating);
        let delta = self.effective_k(total_stake) * (1.0 - expected);
        winner.rating += delta;
        loser.rating -= delta;
        trace!(winner = %winner.id, loser = %loser.id, delta, "post ratings updated");
        delta
    }

    /// Moves a curator's rating by vote correctness against the reference
    /// rating. Returns the signed change.
    pub fn update_curator_rating(&self, curator: &mut Curator, voted_correctly: bool, total_stake: f64) -> f64 {
        let expected = expected_score(curator.rating, self.config.reference_rating);
        let actual = if voted_correctly { 1.0 } else { 0.0 };
        let delta = self.effective_k(total_stake) * (actual - expected);
        curator.rating += delta;
        delta
    }
}
