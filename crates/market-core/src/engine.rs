//! The settlement engine.
//!
//! This module provides the main entry point for running a market. The
//! [`SettlementEngine`] owns every piece of shared state and is the only
//! writer to it.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, info, warn};

use market_integrity::IntegrityMonitor;
use market_ledger::{Curator, CuratorId, LedgerError, Post, PostId, Round, RoundPhase};
use market_pool::RewardPool;
use market_rating::RatingSystem;
use market_scheduler::{AuditIndex, GoldenCandidate, PairScheduler};
use market_strategy::{Ballot, VoteSource};

use crate::config::MarketConfig;
use crate::digest::digest_hex;
use crate::error::MarketError;
use crate::settlement::{plan_round, CuratorSettlement, RoundReport, Shortfall};
use crate::snapshot::MarketSnapshot;
use crate::Result;

/// Mutation applied to the engine at the start of a round.
pub type EventHook = Box<dyn FnOnce(&mut SettlementEngine) -> Result<()>>;

/// Runs rounds against a shared pool.
///
/// # Round Lifecycle
///
/// 1. [`open_round`](Self::open_round): due events run, pairs are
///    scheduled and calibration pairs injected; the round comes back in
///    `VOTING`
/// 2. Votes are recorded, either with
///    [`collect_votes`](Self::collect_votes) or directly on the round
/// 3. [`settle_round`](Self::settle_round): ratings, integrity, slashing
///    and rewards are applied and the round is archived
///
/// [`run_round`](Self::run_round) does all three.
///
/// # Example
///
/// ```rust
/// use market_core::{Curator, MarketConfig, Post, SettlementEngine, Strategy, StrategyBook};
///
/// let mut engine = SettlementEngine::new(MarketConfig::default().with_seed(1))?;
/// let mut book = StrategyBook::new();
/// for i in 0..3 {
///     engine.add_curator(Curator::new(format!("c{i}"), 1_000.0));
///     book.assign(format!("c{i}"), Strategy::honest(0.75))?;
/// }
/// for i in 0..10 {
///     engine.add_post(Post::new(format!("p{i}"), ""));
/// }
/// engine.pool_mut().add_subscription(10_000.0)?;
///
/// let report = engine.run_round(5, &[], &mut book)?;
/// assert_eq!(report.round_id, 0);
/// assert!(engine.pool().balance() <= 10_000.0);
/// # Ok::<(), market_core::MarketError>(())
/// ```
pub struct SettlementEngine {
    config: MarketConfig,
    posts: BTreeMap<PostId, Post>,
    curators: BTreeMap<CuratorId, Curator>,
    pool: RewardPool,
    rating: RatingSystem,
    integrity: IntegrityMonitor,
    scheduler: PairScheduler,
    audit_index: AuditIndex,
    rng: StdRng,
    history: Vec<Round>,
    settled: BTreeSet<u64>,
    next_round_id: u64,
    events: BTreeMap<u64, Vec<EventHook>>,
}

impl SettlementEngine {
    /// Creates an engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration fails validation.
    pub fn new(config: MarketConfig) -> Result<Self> {
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let scheduler = PairScheduler::new(config.scheduler.clone())?;
        let integrity = IntegrityMonitor::new(config.integrity.clone())?;
        let audit_index = AuditIndex::new(config.scheduler.audit_index_capacity);
        let pool = RewardPool::with_config(config.pool.clone());
        let rating = RatingSystem::new(config.rating.clone())?;

        info!(seed = ?config.seed, balance = pool.balance(), "settlement engine initialized");

        Ok(Self {
            config,
            posts: BTreeMap::new(),
            curators: BTreeMap::new(),
            pool,
            rating,
            integrity,
            scheduler,
            audit_index,
            rng,
            history: Vec::new(),
            settled: BTreeSet::new(),
            next_round_id: 0,
            events: BTreeMap::new(),
        })
    }

    /// Registers a curator, replacing and returning any with the same id.
    pub fn add_curator(&mut self, curator: Curator) -> Option<Curator> {
        debug!(curator = %curator.id, stake = curator.stake, "curator added");
        self.curators.insert(curator.id.clone(), curator)
    }

    /// Adds a post, replacing and returning any with the same id.
    pub fn add_post(&mut self, post: Post) -> Option<Post> {
        self.posts.insert(post.id.clone(), post)
    }

    /// Runs `hook` at the start of round `round_id`. Hooks for a round that
    /// has already opened run at the start of the next one.
    pub fn schedule_event<F>(&mut self, round_id: u64, hook: F)
    where
        F: FnOnce(&mut SettlementEngine) -> Result<()> + 'static,
    {
        self.events.entry(round_id).or_default().push(Box::new(hook));
    }

    /// Configuration in use.
    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    /// The reward pool.
    pub fn pool(&self) -> &RewardPool {
        &self.pool
    }

    /// The reward pool, for funding.
    pub fn pool_mut(&mut self) -> &mut RewardPool {
        &mut self.pool
    }

    /// The integrity monitor.
    pub fn integrity(&self) -> &IntegrityMonitor {
        &self.integrity
    }

    /// A post by id.
    pub fn post(&self, id: &str) -> Option<&Post> {
        self.posts.get(id)
    }

    /// A curator by id.
    pub fn curator(&self, id: &str) -> Option<&Curator> {
        self.curators.get(id)
    }

    /// Posts in id order.
    pub fn posts(&self) -> impl Iterator<Item = &Post> {
        self.posts.values()
    }

    /// Curators in id order.
    pub fn curators(&self) -> impl Iterator<Item = &Curator> {
        self.curators.values()
    }

    /// Archived rounds, oldest first.
    pub fn history(&self) -> &[Round] {
        &self.history
    }

    /// Id the next opened round will get.
    pub fn next_round_id(&self) -> u64 {
        self.next_round_id
    }

    /// Opens the next round and returns it in `VOTING`.
    ///
    /// Due events run first. Then `min(⌊posts/2⌋, ⌊subscribers·K⌋)` pairs
    /// are generated and the golden-set and audit slots filled.
    ///
    /// # Errors
    ///
    /// - Any error returned by a due event
    /// - [`MarketError::UnknownPost`] if a golden candidate names a post
    ///   the engine does not hold. Nothing is scheduled or drawn in that
    ///   case.
    pub fn open_round(&mut self, subscribers: usize, golden: &[GoldenCandidate]) -> Result<Round> {
        let round_id = self.next_round_id;
        self.run_due_events(round_id)?;

        for candidate in golden {
            for post_id in [&candidate.left, &candidate.right] {
                if !self.posts.contains_key(post_id) {
                    return Err(MarketError::UnknownPost(post_id.clone()));
                }
            }
        }

        let roster: Vec<Curator> = self.curators.values().cloned().collect();
        let mut round = Round::new(round_id, roster);

        let post_ids: Vec<PostId> = self.posts.keys().cloned().collect();
        let count = self.scheduler.demand_gated_count(post_ids.len(), subscribers);
        *round.pairs_mut()? = self.scheduler.generate_pairs(&mut self.rng, &post_ids, count, round_id);

        round.advance(RoundPhase::CalibrationInject)?;
        let pairs = round.pairs_mut()?;
        let golden_count = self.scheduler.inject_golden_set(&mut self.rng, pairs, golden, round_id);
        let audit_count = self.scheduler.inject_audit_pairs(pairs, &mut self.audit_index, round_id);

        round.advance(RoundPhase::Voting)?;
        self.next_round_id += 1;
        info!(
            round_id,
            pairs = round.pairs().len(),
            golden = golden_count,
            audit = audit_count,
            curators = round.curators().len(),
            "round opened"
        );
        Ok(round)
    }

    fn run_due_events(&mut self, round_id: u64) -> Result<()> {
        let later = self.events.split_off(&(round_id + 1));
        let due = std::mem::replace(&mut self.events, later);
        for (scheduled_for, hooks) in due {
            debug!(round_id, scheduled_for, hooks = hooks.len(), "running events");
            for hook in hooks {
                hook(self)?;
            }
        }
        Ok(())
    }

    /// Asks `source` for every participant's vote on every pair and records
    /// them on `round`.
    ///
    /// Pairs are presented in a freshly shuffled order and the source sees
    /// only the two posts, never the slot kind or answer key.
    ///
    /// # Errors
    ///
    /// Errors from `source`, or ledger errors if `round` is not in
    /// `VOTING`.
    pub fn collect_votes(&mut self, round: &mut Round, source: &mut dyn VoteSource) -> Result<()> {
        let mut order: Vec<usize> = (0..round.pairs().len()).collect();
        order.shuffle(&mut self.rng);

        for (seq, index) in order.into_iter().enumerate() {
            let pair = &round.pairs()[index];
            let left = self
                .posts
                .get(&pair.post_left)
                .ok_or_else(|| MarketError::UnknownPost(pair.post_left.clone()))?;
            let right = self
                .posts
                .get(&pair.post_right)
                .ok_or_else(|| MarketError::UnknownPost(pair.post_right.clone()))?;
            let ballot = Ballot::new(round.id, seq, left, right);

            let mut votes = Vec::with_capacity(round.curators().len());
            for curator in round.curators() {
                let vote = source.vote(&ballot, curator, &mut self.rng)?;
                votes.push((curator.id.clone(), vote));
            }

            let pair_id = pair.id.clone();
            for (curator_id, vote) in votes {
                round.record_vote(&pair_id, &curator_id, vote)?;
            }
        }
        Ok(())
    }

    /// Settles a round in `VOTING` and archives it.
    ///
    /// The base reward is read from the pool once, before any recapture.
    /// Effects are planned from the frozen pairs first, and nothing is
    /// committed unless the whole plan can be.
    ///
    /// # Errors
    ///
    /// - [`MarketError::AlreadySettled`] for a round settled before
    /// - Ledger errors if the round is not in `VOTING`
    /// - [`MarketError::UnknownPost`] / [`MarketError::UnknownCurator`] if
    ///   the round references state the engine does not hold
    pub fn settle_round(&mut self, round: &mut Round) -> Result<RoundReport> {
        if round.phase() == RoundPhase::Archived || self.settled.contains(&round.id) {
            return Err(MarketError::AlreadySettled(round.id));
        }
        if round.phase() != RoundPhase::Voting {
            return Err(LedgerError::WrongPhase {
                round_id: round.id,
                expected: RoundPhase::Voting,
                actual: round.phase(),
            }
            .into());
        }

        // Outcome phase.
        let base_reward = self.pool.calculate_base_reward(round.pairs().len());
        let plan = plan_round(round.pairs(), round.curators(), base_reward, &self.config.payouts);
        for (winner, loser) in &plan.post_updates {
            for post_id in [winner, loser] {
                if !self.posts.contains_key(post_id) {
                    return Err(MarketError::UnknownPost(post_id.clone()));
                }
            }
        }
        for curator in round.curators() {
            if !self.curators.contains_key(&curator.id) {
                return Err(MarketError::UnknownCurator(curator.id.clone()));
            }
        }

        // Commit phase.
        round.advance(RoundPhase::Settlement)?;
        let total_stake = round.total_stake();

        for (winner, loser) in &plan.post_updates {
            self.rate_posts(winner, loser, total_stake);
        }
        for (curator_id, correct) in &plan.curator_updates {
            if let Some(curator) = self.curators.get_mut(curator_id) {
                self.rating.update_curator_rating(curator, *correct, total_stake);
            }
        }
        if plan.minority_loss_total > 0.0 {
            self.pool.add_minority_loss(plan.minority_loss_total)?;
        }

        let participants: Vec<Curator> = round
            .curators()
            .iter()
            .filter_map(|c| self.curators.get(&c.id).cloned())
            .collect();
        let verdicts = self.integrity.process_round_metrics(round.pairs(), &participants);

        let mut results = BTreeMap::new();
        let mut slashed_total = 0.0;
        for (curator_id, accrual) in &plan.accruals {
            let verdict = verdicts.get(curator_id);
            let multiplier = self.integrity.determine_reward_multiplier(curator_id);

            let mut slashed = 0.0;
            if let Some(amount) = verdict.map(|v| v.slash_amount).filter(|a| *a > 0.0) {
                if let Some(curator) = self.curators.get_mut(curator_id) {
                    slashed = curator.slash(amount);
                }
            }
            if slashed > 0.0 {
                self.pool.add_slashing(slashed)?;
                slashed_total += slashed;
            }

            results.insert(
                curator_id.clone(),
                CuratorSettlement {
                    rewards: accrual.rewards * multiplier,
                    slashed,
                    minority_losses: accrual.minority_losses,
                    votes: accrual.votes,
                    score: verdict.map_or(self.config.integrity.initial_score, |v| v.score),
                    suspended: verdict.is_some_and(|v| v.should_suspend),
                    multiplier,
                },
            );
        }

        let requested: f64 = results.values().map(|r| r.rewards).sum();
        let withdrawal = self.pool.withdraw_up_to(requested)?;
        let shortfall = if withdrawal.is_shortfall() {
            for result in results.values_mut() {
                result.rewards *= withdrawal.scale;
            }
            warn!(
                round_id = round.id,
                requested,
                available = withdrawal.paid,
                scale = withdrawal.scale,
                "round rewards scaled to pool balance"
            );
            Some(Shortfall {
                requested,
                available: withdrawal.paid,
                scale: withdrawal.scale,
            })
        } else {
            None
        };

        round.advance(RoundPhase::Archived)?;
        self.audit_index.record_round(round.pairs());
        self.settled.insert(round.id);
        self.history.push(round.clone());

        let digest = digest_hex(&json!({ "round_id": round.id, "results": &results }))?;
        let report = RoundReport {
            round_id: round.id,
            base_reward,
            total_rewards: withdrawal.paid,
            minority_recaptured: plan.minority_loss_total,
            slashed_total,
            shortfall,
            decided_pairs: plan.decided_pairs,
            tied_pairs: plan.tied_pairs,
            results,
            digest,
        };

        info!(
            round_id = report.round_id,
            total_rewards = report.total_rewards,
            decided = report.decided_pairs,
            tied = report.tied_pairs,
            balance = self.pool.balance(),
            "round settled"
        );
        Ok(report)
    }

    /// Opens, votes and settles one round.
    ///
    /// # Errors
    ///
    /// Any error from [`open_round`](Self::open_round),
    /// [`collect_votes`](Self::collect_votes) or
    /// [`settle_round`](Self::settle_round).
    pub fn run_round(
        &mut self,
        subscribers: usize,
        golden: &[GoldenCandidate],
        source: &mut dyn VoteSource,
    ) -> Result<RoundReport> {
        let mut round = self.open_round(subscribers, golden)?;
        self.collect_votes(&mut round, source)?;
        self.settle_round(&mut round)
    }

    /// Serializable copy of posts, curators, pool and integrity scores.
    pub fn snapshot(&self) -> MarketSnapshot {
        MarketSnapshot {
            rounds_settled: self.history.len(),
            posts: self.posts.values().cloned().collect(),
            curators: self.curators.values().cloned().collect(),
            pool: self.pool.stats(),
            integrity_scores: self.integrity.scores(),
        }
    }

    fn rate_posts(&mut self, winner: &str, loser: &str, total_stake: f64) {
        if winner == loser {
            return;
        }
        let Some(mut w) = self.posts.remove(winner) else {
            return;
        };
        let Some(mut l) = self.posts.remove(loser) else {
            self.posts.insert(w.id.clone(), w);
            return;
        };
        self.rating.update_post_ratings(&mut w, &mut l, total_stake);
        self.posts.insert(w.id.clone(), w);
        self.posts.insert(l.id.clone(), l);
    }
}

impl fmt::Debug for SettlementEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettlementEngine")
            .field("posts", &self.posts.len())
            .field("curators", &self.curators.len())
            .field("pool", &self.pool.stats())
            .field("rounds_settled", &self.history.len())
            .field("next_round_id", &self.next_round_id)
            .field("pending_events", &self.events.values().map(Vec::len).sum::<usize>())
            .finish_non_exhaustive()
    }
}
