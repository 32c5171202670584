//! Configuration types for the settlement engine.

use serde::{Deserialize, Serialize};
use std::path::Path;

use market_integrity::IntegrityConfig;
use market_pool::PoolConfig;
use market_rating::RatingConfig;
use market_scheduler::SchedulerConfig;

use crate::error::MarketError;
use crate::Result;

/// Configuration for the whole market.
///
/// Every section falls back to its defaults when omitted, so a JSON file
/// only needs the values it changes:
///
/// ```rust
/// use market_core::MarketConfig;
///
/// let config: MarketConfig = serde_json::from_str(r#"{
///     "payouts": { "minority_payout": 0.5 },
///     "seed": 7
/// }"#)?;
/// assert_eq!(config.payouts.minority_payout, 0.5);
/// assert_eq!(config.payouts.majority_payout, 1.0);
/// assert_eq!(config.scheduler.golden_pct, 0.10);
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    /// Pair scheduling.
    pub scheduler: SchedulerConfig,

    /// Vote payout multipliers.
    pub payouts: PayoutConfig,

    /// Rating updates.
    pub rating: RatingConfig,

    /// Integrity scoring and enforcement.
    pub integrity: IntegrityConfig,

    /// Reward pool.
    pub pool: PoolConfig,

    /// RNG seed. `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl MarketConfig {
    /// Sets the RNG seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Loads a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// fails [`validate`](Self::validate).
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every section.
    ///
    /// # Errors
    ///
    /// The first violation found, as [`MarketError::Config`] or a
    /// component passthrough.
    pub fn validate(&self) -> Result<()> {
        self.payouts.validate()?;
        self.scheduler.validate()?;
        self.integrity.validate()?;
        self.rating.validate()?;

        let pool = &self.pool;
        if !(0.0..=1.0).contains(&pool.payout_rate) {
            return Err(MarketError::Config(format!(
                "pool.payout_rate must be within [0, 1], got {}",
                pool.payout_rate
            )));
        }
        if !pool.initial_balance.is_finite() || pool.initial_balance < 0.0 {
            return Err(MarketError::Config(format!(
                "pool.initial_balance must be a non-negative number, got {}",
                pool.initial_balance
            )));
        }
        Ok(())
    }
}

/// Share of the base reward paid per vote outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PayoutConfig {
    /// Paid for voting with the majority.
    pub majority_payout: f64,
    /// Paid for voting against the majority. The rest of the base reward
    /// goes back to the pool.
    pub minority_payout: f64,
    /// Paid for not revealing.
    pub no_reveal_payout: f64,
}

impl PayoutConfig {
    /// Creates a config with default values: majority 1.0, minority 0.8,
    /// no-reveal 0.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            majority_payout: 1.0,
            minority_payout: 0.8,
            no_reveal_payout: 0.0,
        }
    }

    /// Sets all three payouts.
    #[must_use]
    pub const fn with_payouts(mut self, majority: f64, minority: f64, no_reveal: f64) -> Self {
        self.majority_payout = majority;
        self.minority_payout = minority;
        self.no_reveal_payout = no_reveal;
        self
    }

    /// Requires `0 ≤ no_reveal ≤ minority ≤ majority ≤ 1`.
    ///
    /// # Errors
    ///
    /// [`MarketError::Config`] describing the broken ordering.
    pub fn validate(&self) -> Result<()> {
        let ordered = 0.0 <= self.no_reveal_payout
            && self.no_reveal_payout <= self.minority_payout
            && self.minority_payout <= self.majority_payout
            && self.majority_payout <= 1.0;
        if ordered {
            Ok(())
        } else {
            Err(MarketError::Config(format!(
                "payouts must satisfy 0 <= no_reveal ({}) <= minority ({}) <= majority ({}) <= 1",
                self.no_reveal_payout, self.minority_payout, self.majority_payout
            )))
        }
    }
}

impl Default for PayoutConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SettlementEngine;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = MarketConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.payouts.minority_payout, 0.8);
        assert_eq!(config.scheduler.audit_pct, 0.05);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn test_payout_ordering() {
        for (maj, min, nr) in [(0.8, 1.0, 0.0), (1.0, 0.5, 0.6), (1.2, 0.8, 0.0), (1.0, 0.8, -0.1)] {
            let payouts = PayoutConfig::new().with_payouts(maj, min, nr);
            assert!(payouts.validate().is_err(), "{maj} {min} {nr}");
        }
        assert!(PayoutConfig::new().with_payouts(1.0, 1.0, 1.0).validate().is_ok());
        assert!(PayoutConfig::new().with_payouts(f64::NAN, 0.8, 0.0).validate().is_err());
    }

    #[test]
    fn test_component_validation_passthrough() {
        let mut config = MarketConfig::default();
        config.integrity.slash_threshold = 0.9;
        assert!(matches!(config.validate(), Err(MarketError::Integrity(_))));

        let mut config = MarketConfig::default();
        config.scheduler.golden_pct = 2.0;
        assert!(matches!(config.validate(), Err(MarketError::Scheduler(_))));

        let mut config = MarketConfig::default();
        config.pool.payout_rate = 1.5;
        assert!(matches!(config.validate(), Err(MarketError::Config(_))));

        let mut config = MarketConfig::default();
        config.rating = config.rating.with_reference_rating(f64::NAN);
        assert!(matches!(config.validate(), Err(MarketError::Rating(_))));
        assert!(SettlementEngine::new(config).is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = MarketConfig::default().with_seed(99);
        let json = serde_json::to_string(&config).unwrap();
        let parsed: MarketConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"pool": {{"initial_balance": 5000.0}}, "seed": 3}}"#).unwrap();
        let config = MarketConfig::from_path(file.path()).unwrap();
        assert_eq!(config.pool.initial_balance, 5000.0);
        assert_eq!(config.pool.payout_rate, 0.02);
        assert_eq!(config.seed, Some(3));
    }

    #[test]
    fn test_from_path_rejects_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"payouts": {{"minority_payout": 1.5}}}}"#).unwrap();
        assert!(MarketConfig::from_path(file.path()).is_err());
        assert!(matches!(
            MarketConfig::from_path("/definitely/not/here.json"),
            Err(MarketError::Io(_))
        ));
    }
}
