//! Settlement records and the per-pair outcome phase.
//!
//! Settlement runs in two phases. [`plan_round`] walks the frozen pairs and
//! works out every effect without touching shared state. The engine then
//! commits the plan in one pass. A plan that cannot be committed (for
//! example because a pair names an unknown post) is rejected before any
//! rating, balance or stake changes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use market_ledger::{Curator, CuratorId, Pair, PostId, Vote};

use crate::config::PayoutConfig;

/// Pool could not cover a round's rewards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Shortfall {
    /// Aggregate reward after multipliers.
    pub requested: f64,
    /// Pool balance at withdrawal time.
    pub available: f64,
    /// Factor every curator's reward was scaled by.
    pub scale: f64,
}

/// One curator's result for one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CuratorSettlement {
    /// Reward paid.
    pub rewards: f64,
    /// Stake slashed.
    pub slashed: f64,
    /// Reward withheld for minority votes and returned to the pool.
    pub minority_losses: f64,
    /// Revealed votes on decided pairs.
    pub votes: u32,
    /// Integrity score after this round.
    pub score: f64,
    /// Suspended after this round.
    pub suspended: bool,
    /// Reward multiplier applied.
    pub multiplier: f64,
}

/// Everything a settled round produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundReport {
    /// Round settled.
    pub round_id: u64,
    /// Per-pair reward budget used for the whole round.
    pub base_reward: f64,
    /// Total paid out.
    pub total_rewards: f64,
    /// Minority losses credited back to the pool.
    pub minority_recaptured: f64,
    /// Stake slashed into the pool.
    pub slashed_total: f64,
    /// Present when rewards were scaled down.
    pub shortfall: Option<Shortfall>,
    /// Pairs with a majority.
    pub decided_pairs: usize,
    /// Pairs without a majority.
    pub tied_pairs: usize,
    /// Per-curator results.
    pub results: BTreeMap<CuratorId, CuratorSettlement>,
    /// SHA-256 of the canonical JSON of round id and results.
    pub digest: String,
}

impl RoundReport {
    /// Result for one curator.
    pub fn result(&self, curator_id: &str) -> Option<&CuratorSettlement> {
        self.results.get(curator_id)
    }
}

/// Pre-multiplier totals for one curator.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Accrual {
    pub rewards: f64,
    pub minority_losses: f64,
    pub votes: u32,
}

/// Effects of a round, computed before anything is committed.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct RoundPlan {
    /// Keyed by every roster member, in id order.
    pub accruals: BTreeMap<CuratorId, Accrual>,
    /// `(winner, loser)` per decided pair, in slot order.
    pub post_updates: Vec<(PostId, PostId)>,
    /// `(curator, voted_with_majority)` per revealed vote on decided pairs.
    pub curator_updates: Vec<(CuratorId, bool)>,
    pub minority_loss_total: f64,
    pub decided_pairs: usize,
    pub tied_pairs: usize,
}

/// Outcome phase of settlement. Pure.
///
/// Tied pairs contribute nothing. On a decided pair every roster member
/// accrues `base × payout` for their vote class; minority voters also
/// accrue the withheld `base × (1 − minority_payout)` as a loss.
pub(crate) fn plan_round(pairs: &[Pair], roster: &[Curator], base_reward: f64, payouts: &PayoutConfig) -> RoundPlan {
    let mut plan = RoundPlan {
        accruals: roster
            .iter()
            .map(|c| (c.id.clone(), Accrual::default()))
            .collect(),
        ..RoundPlan::default()
    };

    for pair in pairs {
        let Some(side) = pair.majority_vote() else {
            plan.tied_pairs += 1;
            continue;
        };
        plan.decided_pairs += 1;
        if let Some((winner, loser)) = pair.winner_loser(side) {
            plan.post_updates.push((winner.clone(), loser.clone()));
        }

        for curator in roster {
            let Some(accrual) = plan.accruals.get_mut(&curator.id) else {
                continue;
            };
            match pair.vote_of(&curator.id) {
                Vote::NoReveal => {
                    accrual.rewards += base_reward * payouts.no_reveal_payout;
                }
                vote if vote == side => {
                    accrual.rewards += base_reward * payouts.majority_payout;
                    accrual.votes += 1;
                    plan.curator_updates.push((curator.id.clone(), true));
                }
                _ => {
                    let loss = base_reward * (1.0 - payouts.minority_payout);
                    accrual.rewards += base_reward * payouts.minority_payout;
                    accrual.minority_losses += loss;
                    accrual.votes += 1;
                    plan.minority_loss_total += loss;
                    plan.curator_updates.push((curator.id.clone(), false));
                }
            }
        }
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Vec<Curator> {
        ["c1", "c2", "c3"].iter().map(|id| Curator::new(*id, 100.0)).collect()
    }

    fn pair(id: &str, votes: &[(&str, Vote)]) -> Pair {
        let mut pair = Pair::new(id, "a", "b");
        for (c, v) in votes {
            pair.add_vote(*c, *v).unwrap();
        }
        pair
    }

    #[test]
    fn test_majority_minority_accruals() {
        let pairs = vec![pair("p", &[("c1", Vote::Left), ("c2", Vote::Left), ("c3", Vote::Right)])];
        let plan = plan_round(&pairs, &roster(), 10.0, &PayoutConfig::default());

        assert_eq!(plan.accruals["c1"].rewards, 10.0);
        assert_eq!(plan.accruals["c2"].rewards, 10.0);
        assert!((plan.accruals["c3"].rewards - 8.0).abs() < 1e-12);
        assert!((plan.accruals["c3"].minority_losses - 2.0).abs() < 1e-12);
        assert!((plan.minority_loss_total - 2.0).abs() < 1e-12);
        assert_eq!(plan.post_updates, vec![("a".to_string(), "b".to_string())]);
        assert_eq!(plan.curator_updates.len(), 3);
    }

    #[test]
    fn test_tie_has_no_effects() {
        let pairs = vec![pair("p", &[("c1", Vote::Left), ("c2", Vote::Right)])];
        let plan = plan_round(&pairs, &roster(), 10.0, &PayoutConfig::default());
        assert_eq!(plan.tied_pairs, 1);
        assert_eq!(plan.decided_pairs, 0);
        assert!(plan.post_updates.is_empty());
        assert!(plan.curator_updates.is_empty());
        assert!(plan.accruals.values().all(|a| a.rewards == 0.0 && a.votes == 0));
    }

    #[test]
    fn test_no_reveal_paid_but_not_counted() {
        let payouts = PayoutConfig::new().with_payouts(1.0, 0.8, 0.1);
        let pairs = vec![pair("p", &[("c1", Vote::Right), ("c2", Vote::NoReveal)])];
        let plan = plan_round(&pairs, &roster(), 10.0, &payouts);

        assert!((plan.accruals["c2"].rewards - 1.0).abs() < 1e-12);
        assert_eq!(plan.accruals["c2"].votes, 0);
        // c3 never voted: same as an explicit no-reveal.
        assert_eq!(plan.accruals["c3"], plan.accruals["c2"]);
        assert_eq!(plan.curator_updates, vec![("c1".to_string(), true)]);
        assert_eq!(plan.post_updates, vec![("b".to_string(), "a".to_string())]);
    }

    #[test]
    fn test_votes_from_outside_roster_ignored_for_payouts() {
        let pairs = vec![pair("p", &[("c1", Vote::Left), ("ghost", Vote::Left)])];
        let plan = plan_round(&pairs, &roster(), 10.0, &PayoutConfig::default());
        assert!(!plan.accruals.contains_key("ghost"));
        assert_eq!(plan.accruals.len(), 3);
    }

    #[test]
    fn test_report_serialization() {
        let report = RoundReport {
            round_id: 4,
            base_reward: 1.5,
            total_rewards: 3.0,
            minority_recaptured: 0.0,
            slashed_total: 0.0,
            shortfall: Some(Shortfall {
                requested: 6.0,
                available: 3.0,
                scale: 0.5,
            }),
            decided_pairs: 2,
            tied_pairs: 0,
            results: BTreeMap::new(),
            digest: "00".to_string(),
        };
        let json = serde_json::to_string(&report).unwrap();
        let parsed: RoundReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);
    }
}
