//! # Pool Ledger
//!
//! Tracks the pool balance and the running totals behind it.
//!
//! ## Flows
//!
//! | Flow | Direction | Counter |
//! |------|-----------|---------|
//! | Subscription revenue | in | `total_subscriptions` |
//! | Slashed stake | in | `total_slashing` |
//! | Minority shortfall | in | `total_minority_losses` |
//! | Curator rewards | out | `total_withdrawn` |
//! | Unpaid nominal rewards | none | `total_shortfall` |
//!
//! ## Base Reward
//!
//! Each round derives a per-pair budget from the balance:
//!
//! ```text
//! base_reward = balance × payout_rate / num_pairs
//! ```
//!
//! Every participating curator accrues a multiple of that budget, so the
//! nominal round total can exceed the balance. Settlement remedies that
//! through [`RewardPool::withdraw_up_to`], which pays the largest amount the
//! pool can cover and reports the scale factor for pro-rata distribution.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{PoolError, Result};

/// Configuration for the reward pool.
///
/// # Example
///
/// ```rust
/// use market_pool::PoolConfig;
///
/// let config = PoolConfig::new()
///     .with_initial_balance(50_000.0)
///     .with_payout_rate(0.05);
/// assert_eq!(config.payout_rate, 0.05);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Balance seeded into the pool at start.
    pub initial_balance: f64,
    /// Fraction of the balance budgeted for one round's pairs.
    pub payout_rate: f64,
}

impl PoolConfig {
    /// Creates a config with default values.
    ///
    /// Defaults:
    /// - Initial balance: 0
    /// - Payout rate: 0.02 (2% of balance per round)
    #[must_use]
    pub const fn new() -> Self {
        Self {
            initial_balance: 0.0,
            payout_rate: 0.02,
        }
    }

    /// Sets the initial balance.
    #[must_use]
    pub const fn with_initial_balance(mut self, balance: f64) -> Self {
        self.initial_balance = balance;
        self
    }

    /// Sets the payout rate.
    #[must_use]
    pub const fn with_payout_rate(mut self, rate: f64) -> Self {
        self.payout_rate = rate;
        self
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of a bounded withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Withdrawal {
    /// Amount asked for.
    pub requested: f64,
    /// Amount actually debited.
    pub paid: f64,
    /// `paid / requested`, 1.0 when fully covered or nothing was requested.
    pub scale: f64,
}

impl Withdrawal {
    /// Returns true when the pool could not cover the request.
    pub fn is_shortfall(&self) -> bool {
        self.paid < self.requested
    }

    /// Unpaid remainder.
    pub fn shortfall(&self) -> f64 {
        (self.requested - self.paid).max(0.0)
    }
}

/// Point-in-time copy of the pool's counters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Current balance.
    pub balance: f64,
    /// Subscription revenue received.
    pub total_subscriptions: f64,
    /// Slashed stake received.
    pub total_slashing: f64,
    /// Minority shortfall received.
    pub total_minority_losses: f64,
    /// Rewards paid out.
    pub total_withdrawn: f64,
    /// Nominal rewards the pool could not cover.
    pub total_shortfall: f64,
}

/// The shared reward pool.
///
/// # Thread Safety
///
/// `RewardPool` is not synchronized. The settlement engine is its only
/// writer and settles one round at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardPool {
    balance: f64,
    payout_rate: f64,
    total_subscriptions: f64,
    total_slashing: f64,
    total_minority_losses: f64,
    total_withdrawn: f64,
    total_shortfall: f64,
}

impl RewardPool {
    /// Creates a pool with the given opening balance and the default
    /// payout rate. An invalid opening balance is treated as zero.
    #[must_use]
    pub fn new(initial_balance: f64) -> Self {
        Self::with_config(PoolConfig::new().with_initial_balance(initial_balance))
    }

    /// Creates a pool from configuration.
    #[must_use]
    pub fn with_config(config: PoolConfig) -> Self {
        let balance = if config.initial_balance.is_finite() && config.initial_balance > 0.0 {
            config.initial_balance
        } else {
            0.0
        };
        Self {
            balance,
            payout_rate: config.payout_rate.clamp(0.0, 1.0),
            total_subscriptions: 0.0,
            total_slashing: 0.0,
            total_minority_losses: 0.0,
            total_withdrawn: 0.0,
            total_shortfall: 0.0,
        }
    }

    /// Current balance.
    #[inline]
    #[must_use]
    pub fn balance(&self) -> f64 {
        self.balance
    }

    /// Fraction of the balance budgeted per round.
    #[inline]
    #[must_use]
    pub fn payout_rate(&self) -> f64 {
        self.payout_rate
    }

    /// Snapshot of all counters.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            balance: self.balance,
            total_subscriptions: self.total_subscriptions,
            total_slashing: self.total_slashing,
            total_minority_losses: self.total_minority_losses,
            total_withdrawn: self.total_withdrawn,
            total_shortfall: self.total_shortfall,
        }
    }

    /// Credits subscription revenue.
    ///
    /// # Errors
    ///
    /// [`PoolError::InvalidAmount`] for negative or non-finite amounts.
    pub fn add_subscription(&mut self, amount: f64) -> Result<f64> {
        check_amount("add_subscription", amount)?;
        self.balance += amount;
        self.total_subscriptions += amount;
        debug!(amount, balance = self.balance, "subscription credited");
        Ok(self.balance)
    }

    /// Credits the part of a minority voter's reward that was withheld.
    ///
    /// # Errors
    ///
    /// [`PoolError::InvalidAmount`] for negative or non-finite amounts.
    pub fn add_minority_loss(&mut self, amount: f64) -> Result<f64> {
        check_amount("add_minority_loss", amount)?;
        self.balance += amount;
        self.total_minority_losses += amount;
        Ok(self.balance)
    }

    /// Credits slashed stake.
    ///
    /// # Errors
    ///
    /// [`PoolError::InvalidAmount`] for negative or non-finite amounts.
    pub fn add_slashing(&mut self, amount: f64) -> Result<f64> {
        check_amount("add_slashing", amount)?;
        self.balance += amount;
        self.total_slashing += amount;
        info!(amount, balance = self.balance, "slashed stake credited");
        Ok(self.balance)
    }

    /// Per-pair reward budget for a round with `num_pairs` pairs.
    ///
    /// Returns 0 for a pair-less round.
    #[must_use]
    pub fn calculate_base_reward(&self, num_pairs: usize) -> f64 {
        if num_pairs == 0 {
            return 0.0;
        }
        self.balance * self.payout_rate / num_pairs as f64
    }

    /// Debits exactly `amount`.
    ///
    /// # Errors
    ///
    /// - [`PoolError::InsufficientBalance`] if `amount` exceeds the balance;
    ///   the balance is left unchanged
    /// - [`PoolError::InvalidAmount`] for negative or non-finite amounts
    ///
    /// # Example
    ///
    /// ```rust
    /// use market_pool::RewardPool;
    ///
    /// let mut pool = RewardPool::new(100.0);
    /// assert_eq!(pool.withdraw(40.0)?, 60.0);
    /// assert!(pool.withdraw(61.0).is_err());
    /// assert_eq!(pool.balance(), 60.0);
    /// # Ok::<(), market_pool::PoolError>(())
    /// ```
    pub fn withdraw(&mut self, amount: f64) -> Result<f64> {
        check_amount("withdraw", amount)?;
        if amount > self.balance {
            return Err(PoolError::InsufficientBalance {
                requested: amount,
                available: self.balance,
            });
        }
        self.balance -= amount;
        self.total_withdrawn += amount;
        Ok(self.balance)
    }

    /// Debits `requested`, or the whole balance if that is less.
    ///
    /// The returned [`Withdrawal`] carries the scale factor settlement
    /// applies to every curator's reward. Any unpaid remainder is added to
    /// `total_shortfall`.
    ///
    /// # Errors
    ///
    /// [`PoolError::InvalidAmount`] for negative or non-finite amounts.
    pub fn withdraw_up_to(&mut self, requested: f64) -> Result<Withdrawal> {
        check_amount("withdraw_up_to", requested)?;
        if requested <= self.balance {
            self.withdraw(requested)?;
            return Ok(Withdrawal {
                requested,
                paid: requested,
                scale: 1.0,
            });
        }

        let paid = self.balance;
        let scale = paid / requested;
        self.balance = 0.0;
        self.total_withdrawn += paid;
        self.total_shortfall += requested - paid;
        warn!(requested, paid, scale, "pool shortfall, rewards scaled pro-rata");
        Ok(Withdrawal {
            requested,
            paid,
            scale,
        })
    }
}

impl Default for RewardPool {
    fn default() -> Self {
        Self::with_config(PoolConfig::default())
    }
}

fn check_amount(operation: &'static str, amount: f64) -> Result<()> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(())
    } else {
        Err(PoolError::InvalidAmount { operation, amount })
    }
}
