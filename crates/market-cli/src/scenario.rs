//! Scenario files and the loop that runs them.
//!
//! A scenario lists who curates, what they curate, who reads it and how the
//! pool is funded. Every field except `name` has a default, so a file only
//! spells out what makes the scenario different.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use tracing::info;

use market_core::{
    CoordinatedGroup, Curator, GoldenCandidate, GroupKind, MarketConfig, PoolStats, Post, Reader, ReaderPool,
    RoundReport, SettlementEngine, Strategy, StrategyBook,
};

/// Stake of a regular curator when a scenario does not give one.
pub const BASE_STAKE: f64 = 1_000.0;

fn default_rounds() -> u64 {
    100
}

fn default_initial_funding() -> f64 {
    100_000.0
}

fn default_subscription_price() -> f64 {
    10.0
}

fn default_count() -> usize {
    1
}

fn default_stake() -> f64 {
    BASE_STAKE
}

/// A complete market setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Display name.
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Rounds to run unless overridden on the command line.
    #[serde(default = "default_rounds")]
    pub rounds: u64,
    #[serde(default)]
    pub config: MarketConfig,
    /// Paid into the pool before the first round.
    #[serde(default = "default_initial_funding")]
    pub initial_funding: f64,
    /// Paid into the pool per subscriber at the start of every round.
    #[serde(default = "default_subscription_price")]
    pub subscription_price: f64,
    #[serde(default)]
    pub curators: Vec<CuratorSpec>,
    #[serde(default)]
    pub groups: Vec<GroupSpec>,
    #[serde(default)]
    pub markets: Vec<MarketSpec>,
    #[serde(default)]
    pub readers: Vec<ReaderSpec>,
    /// Golden-set candidates. Must name posts of markets open from round 0.
    #[serde(default)]
    pub golden: Vec<GoldenCandidate>,
    /// Starting ratings for individual posts; the rest start at the
    /// default rating.
    #[serde(default)]
    pub initial_ratings: BTreeMap<String, f64>,
}

/// One or more independent curators sharing a strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CuratorSpec {
    /// Curator id, or id prefix when `count > 1`.
    pub id: String,
    pub strategy: Strategy,
    /// Defaults to the base stake times the strategy's stake multiplier.
    #[serde(default)]
    pub stake: Option<f64>,
    #[serde(default = "default_count")]
    pub count: usize,
}

impl CuratorSpec {
    /// Expanded curator ids.
    pub fn ids(&self) -> Vec<String> {
        expand(&self.id, self.count)
    }

    /// Stake each curator starts with.
    pub fn stake(&self) -> f64 {
        self.stake.unwrap_or(BASE_STAKE * self.strategy.stake_multiplier())
    }
}

/// A coordinated group. Members are named `{id}_{n}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSpec {
    pub id: String,
    pub kind: GroupKind,
    pub size: usize,
    pub accuracy: f64,
    /// Stake of each member.
    #[serde(default = "default_stake")]
    pub stake: f64,
}

impl GroupSpec {
    /// Member ids.
    pub fn member_ids(&self) -> Vec<String> {
        (0..self.size).map(|i| format!("{}_{i}", self.id)).collect()
    }
}

/// A content market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSpec {
    pub id: String,
    /// Number of posts, named `{id}_post_{n}`.
    pub posts: usize,
    /// Baseline subscribers while the market is open.
    #[serde(default)]
    pub subscribers: usize,
    /// Round the market's posts are added in.
    #[serde(default)]
    pub opens_at: u64,
}

impl MarketSpec {
    /// Post ids.
    pub fn post_ids(&self) -> Vec<String> {
        (0..self.posts).map(|i| format!("{}_post_{i}", self.id)).collect()
    }

    fn build_posts(&self, ratings: &BTreeMap<String, f64>) -> Vec<Post> {
        self.post_ids()
            .into_iter()
            .enumerate()
            .map(|(i, id)| {
                let content = format!("Post {i} in {}", self.id);
                match ratings.get(&id) {
                    Some(rating) => Post::with_rating(id, content, *rating),
                    None => Post::new(id, content),
                }
            })
            .collect()
    }
}

/// Readers sharing a behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderSpec {
    #[serde(default = "default_count")]
    pub count: usize,
    pub behavior: Reader,
}

fn expand(id: &str, count: usize) -> Vec<String> {
    if count == 1 {
        vec![id.to_string()]
    } else {
        (0..count).map(|i| format!("{id}_{i}")).collect()
    }
}

impl Scenario {
    /// Loads and validates a JSON scenario.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or fails
    /// [`validate`](Self::validate).
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).with_context(|| format!("reading scenario {}", path.display()))?;
        let scenario: Self =
            serde_json::from_str(&text).with_context(|| format!("parsing scenario {}", path.display()))?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Checks the market config and the scenario's own consistency.
    ///
    /// # Errors
    ///
    /// The first problem found.
    pub fn validate(&self) -> Result<()> {
        self.config.validate().context("invalid market config")?;

        for (field, value) in [
            ("initial_funding", self.initial_funding),
            ("subscription_price", self.subscription_price),
        ] {
            if !value.is_finite() || value < 0.0 {
                bail!("{field} must be a non-negative number, got {value}");
            }
        }

        let mut curator_ids = BTreeSet::new();
        for spec in &self.curators {
            if spec.strategy.group().is_some() {
                bail!("curator '{}': coordinated curators are declared under groups", spec.id);
            }
            if spec.count == 0 {
                bail!("curator '{}': count must be at least 1", spec.id);
            }
            if spec.stake().is_nan() || spec.stake() < 0.0 {
                bail!("curator '{}': stake must be non-negative", spec.id);
            }
            for id in spec.ids() {
                if !curator_ids.insert(id.clone()) {
                    bail!("duplicate curator id '{id}'");
                }
            }
        }
        for group in &self.groups {
            for id in group.member_ids() {
                if !curator_ids.insert(id.clone()) {
                    bail!("duplicate curator id '{id}'");
                }
            }
        }
        if curator_ids.is_empty() {
            bail!("scenario '{}' has no curators", self.name);
        }

        let mut market_ids = BTreeSet::new();
        let mut all_posts = BTreeSet::new();
        let mut opening_posts = BTreeSet::new();
        for market in &self.markets {
            if !market_ids.insert(market.id.as_str()) {
                bail!("duplicate market id '{}'", market.id);
            }
            all_posts.extend(market.post_ids());
            if market.opens_at == 0 {
                opening_posts.extend(market.post_ids());
            }
        }
        for (post, rating) in &self.initial_ratings {
            if !all_posts.contains(post) {
                bail!("initial rating given for unknown post '{post}'");
            }
            if !rating.is_finite() {
                bail!("initial rating of '{post}' must be finite, got {rating}");
            }
        }
        if self.markets.is_empty() {
            bail!("scenario '{}' has no markets", self.name);
        }
        for candidate in &self.golden {
            for post in [&candidate.left, &candidate.right] {
                if !opening_posts.contains(post) {
                    bail!("golden pair names '{post}', which is not a post of a market open at round 0");
                }
            }
        }
        Ok(())
    }

    /// Sets up an engine, strategy book and readers for this scenario.
    ///
    /// # Errors
    ///
    /// Returns an error if a group is malformed or the engine rejects the
    /// config.
    pub fn build(&self) -> Result<Simulation> {
        let mut engine = SettlementEngine::new(self.config.clone())?;
        let mut book = StrategyBook::new();

        for spec in &self.curators {
            for id in spec.ids() {
                engine.add_curator(Curator::new(id.clone(), spec.stake()));
                book.assign(id, spec.strategy.clone())?;
            }
        }
        for spec in &self.groups {
            let members = spec.member_ids();
            let group = CoordinatedGroup::new(spec.kind, members.iter().cloned(), spec.accuracy)
                .with_context(|| format!("group '{}'", spec.id))?;
            book.enroll_group(group);
            for id in members {
                engine.add_curator(Curator::new(id, spec.stake));
            }
        }

        for market in &self.markets {
            let posts = market.build_posts(&self.initial_ratings);
            if market.opens_at == 0 {
                for post in posts {
                    engine.add_post(post);
                }
            } else {
                let market_id = market.id.clone();
                engine.schedule_event(market.opens_at, move |engine| {
                    let count = posts.len();
                    for post in posts {
                        engine.add_post(post);
                    }
                    info!(market = %market_id, posts = count, "market opened");
                    Ok(())
                });
            }
        }

        if self.initial_funding > 0.0 {
            engine.pool_mut().add_subscription(self.initial_funding)?;
        }

        let mut readers = ReaderPool::new();
        for (i, spec) in self.readers.iter().enumerate() {
            for n in 0..spec.count {
                readers.add(format!("reader_{i}_{n}"), spec.behavior.clone());
            }
        }

        Ok(Simulation {
            name: self.name.clone(),
            markets: self.markets.clone(),
            golden: self.golden.clone(),
            subscription_price: self.subscription_price,
            engine,
            book,
            readers,
            reports: Vec::new(),
        })
    }
}

/// A scenario in progress.
#[derive(Debug)]
pub struct Simulation {
    name: String,
    markets: Vec<MarketSpec>,
    golden: Vec<GoldenCandidate>,
    subscription_price: f64,
    engine: SettlementEngine,
    book: StrategyBook,
    readers: ReaderPool,
    reports: Vec<RoundReport>,
}

impl Simulation {
    /// The engine.
    pub fn engine(&self) -> &SettlementEngine {
        &self.engine
    }

    /// The readers.
    pub fn readers(&self) -> &ReaderPool {
        &self.readers
    }

    /// Reports of every round run so far.
    pub fn reports(&self) -> &[RoundReport] {
        &self.reports
    }

    /// Subscribers demanding content in `round_id`: baseline subscribers of
    /// open markets plus active readers.
    pub fn subscribers(&self, round_id: u64) -> usize {
        let baseline: usize = self
            .markets
            .iter()
            .filter(|m| m.opens_at <= round_id)
            .map(|m| m.subscribers)
            .sum();
        baseline + self.readers.active_subscribers()
    }

    /// Collects subscriptions, runs one round and lets readers judge the
    /// resulting feed.
    ///
    /// # Errors
    ///
    /// Any error from the engine.
    pub fn step(&mut self) -> Result<&RoundReport> {
        let round_id = self.engine.next_round_id();
        let subscribers = self.subscribers(round_id);
        let revenue = subscribers as f64 * self.subscription_price;
        if revenue > 0.0 {
            self.engine.pool_mut().add_subscription(revenue)?;
        }

        let report = self
            .engine
            .run_round(subscribers, &self.golden, &mut self.book)
            .with_context(|| format!("round {round_id}"))?;

        if let Some(avg) = self.engine.snapshot().average_post_rating() {
            let base = self.engine.config().rating.reference_rating;
            self.readers.observe_round(avg, base, round_id);
        }

        self.reports.push(report);
        self.reports.last().context("round report missing after push")
    }

    /// Runs `rounds` rounds and summarizes.
    ///
    /// # Errors
    ///
    /// Any error from [`step`](Self::step).
    pub fn run(&mut self, rounds: u64) -> Result<Summary> {
        let progress_every = (rounds / 10).max(1);
        for n in 1..=rounds {
            self.step()?;
            if n % progress_every == 0 {
                info!(
                    scenario = %self.name,
                    round = n,
                    of = rounds,
                    balance = self.engine.pool().balance(),
                    "progress"
                );
            }
        }
        Ok(self.summary())
    }

    /// Aggregates the rounds run so far.
    pub fn summary(&self) -> Summary {
        let mut rewards: BTreeMap<&str, f64> = BTreeMap::new();
        let mut slashed: BTreeMap<&str, f64> = BTreeMap::new();
        for report in &self.reports {
            for (id, result) in &report.results {
                *rewards.entry(id.as_str()).or_insert(0.0) += result.rewards;
                *slashed.entry(id.as_str()).or_insert(0.0) += result.slashed;
            }
        }

        let initial_score = self.engine.config().integrity.initial_score;
        let mut strategies: BTreeMap<String, StrategySummary> = BTreeMap::new();
        for curator in self.engine.curators() {
            let id = curator.id.as_str();
            let entry = strategies.entry(self.label_of(id)).or_default();
            entry.curators += 1;
            entry.total_rewards += rewards.get(id).copied().unwrap_or(0.0);
            entry.slashed += slashed.get(id).copied().unwrap_or(0.0);
            entry.mean_score += self
                .engine
                .integrity()
                .score_of(id)
                .map_or(initial_score, |s| s.value());
            if self.engine.integrity().is_suspended(id) {
                entry.suspended += 1;
            }
        }
        for entry in strategies.values_mut() {
            let n = entry.curators as f64;
            entry.mean_rewards = entry.total_rewards / n;
            entry.mean_score /= n;
        }

        Summary {
            scenario: self.name.clone(),
            rounds: self.reports.len(),
            pool: self.engine.pool().stats(),
            average_post_rating: self.engine.snapshot().average_post_rating(),
            active_readers: self.readers.active_subscribers(),
            churned_readers: self.readers.churned(),
            shortfall_rounds: self.reports.iter().filter(|r| r.shortfall.is_some()).count(),
            strategies,
            last_digest: self.reports.last().map(|r| r.digest.clone()),
        }
    }

    fn label_of(&self, curator_id: &str) -> String {
        match self.book.strategy_of(curator_id) {
            Some(Strategy::Coordinated { group }) => self
                .book
                .group(*group)
                .map_or_else(|| "coordinated".to_string(), |g| g.kind().to_string()),
            Some(strategy) => strategy.label().to_string(),
            None => "unassigned".to_string(),
        }
    }
}

/// Per-strategy aggregates.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StrategySummary {
    pub curators: usize,
    pub total_rewards: f64,
    pub mean_rewards: f64,
    pub mean_score: f64,
    pub suspended: usize,
    pub slashed: f64,
}

/// What a run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub scenario: String,
    pub rounds: usize,
    pub pool: PoolStats,
    pub average_post_rating: Option<f64>,
    pub active_readers: usize,
    pub churned_readers: usize,
    pub shortfall_rounds: usize,
    pub strategies: BTreeMap<String, StrategySummary>,
    pub last_digest: Option<String>,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Scenario: {} ({} rounds)", self.scenario, self.rounds)?;
        writeln!(
            f,
            "Pool: balance {:.2} | subscriptions {:.2} | withdrawn {:.2} | minority losses {:.2} | slashing {:.2}",
            self.pool.balance,
            self.pool.total_subscriptions,
            self.pool.total_withdrawn,
            self.pool.total_minority_losses,
            self.pool.total_slashing
        )?;
        if self.shortfall_rounds > 0 {
            writeln!(
                f,
                "Shortfall: {} rounds, {:.2} unpaid",
                self.shortfall_rounds, self.pool.total_shortfall
            )?;
        }
        if let Some(avg) = self.average_post_rating {
            writeln!(f, "Average post rating: {avg:.1}")?;
        }
        writeln!(
            f,
            "Readers: {} active, {} churned",
            self.active_readers, self.churned_readers
        )?;
        writeln!(f)?;
        writeln!(
            f,
            "{:<16} {:>8} {:>14} {:>8} {:>10} {:>10}",
            "strategy", "curators", "mean reward", "score", "suspended", "slashed"
        )?;
        for (label, s) in &self.strategies {
            writeln!(
                f,
                "{:<16} {:>8} {:>14.2} {:>8.3} {:>10} {:>10.2}",
                label, s.curators, s.mean_rewards, s.mean_score, s.suspended, s.slashed
            )?;
        }
        if let Some(digest) = &self.last_digest {
            writeln!(f)?;
            write!(f, "Last settlement digest: {digest}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SMALL: &str = r#"{
        "name": "small",
        "rounds": 3,
        "config": { "seed": 42 },
        "initial_funding": 10000.0,
        "curators": [
            { "id": "honest", "strategy": { "type": "honest", "accuracy": 0.75 }, "count": 6 },
            { "id": "lazy", "strategy": { "type": "lazy" } },
            { "id": "whale", "strategy": { "type": "whale", "accuracy": 0.7 } }
        ],
        "groups": [
            { "id": "farm", "kind": "sybil_farm", "size": 4, "accuracy": 0.65, "stake": 250.0 }
        ],
        "markets": [
            { "id": "m0", "posts": 20, "subscribers": 15 },
            { "id": "late", "posts": 10, "subscribers": 5, "opens_at": 2 }
        ],
        "readers": [
            { "count": 3, "behavior": { "type": "free_rider" } }
        ],
        "golden": [
            { "left": "m0_post_0", "right": "m0_post_1", "answer": "Left" }
        ],
        "initial_ratings": { "m0_post_0": 1900.0, "m0_post_1": 1100.0 }
    }"#;

    fn small() -> Scenario {
        serde_json::from_str(SMALL).unwrap()
    }

    #[test]
    fn test_parse_defaults() {
        let scenario: Scenario = serde_json::from_str(
            r#"{"name": "x", "curators": [{"id": "c", "strategy": {"type": "random"}}], "markets": [{"id": "m", "posts": 4}]}"#,
        )
        .unwrap();
        assert_eq!(scenario.rounds, 100);
        assert_eq!(scenario.initial_funding, 100_000.0);
        assert_eq!(scenario.subscription_price, 10.0);
        assert_eq!(scenario.curators[0].count, 1);
        assert_eq!(scenario.markets[0].subscribers, 0);
        assert!(scenario.validate().is_ok());
    }

    #[test]
    fn test_curator_expansion_and_stakes() {
        let scenario = small();
        assert_eq!(scenario.curators[0].ids().len(), 6);
        assert_eq!(scenario.curators[0].ids()[5], "honest_5");
        assert_eq!(scenario.curators[1].ids(), vec!["lazy".to_string()]);
        assert_eq!(scenario.curators[2].stake(), 50_000.0);
        assert_eq!(scenario.curators[0].stake(), BASE_STAKE);
        assert_eq!(scenario.groups[0].member_ids()[3], "farm_3");
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let mut scenario = small();
        scenario.curators.push(scenario.curators[1].clone());
        let err = scenario.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate curator id 'lazy'"));
    }

    #[test]
    fn test_validate_rejects_coordinated_curator() {
        let mut scenario = small();
        scenario.curators[1].strategy = Strategy::Coordinated { group: 0 };
        assert!(scenario.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_late_golden_post() {
        let mut scenario = small();
        scenario.golden.push(GoldenCandidate::new("late_post_0", "m0_post_2", market_core::Vote::Right));
        let err = scenario.validate().unwrap_err();
        assert!(err.to_string().contains("late_post_0"));
    }

    #[test]
    fn test_validate_rejects_bad_config() {
        let mut scenario = small();
        scenario.config.payouts.minority_payout = 2.0;
        assert!(scenario.validate().is_err());
    }

    #[test]
    fn test_initial_ratings_applied() {
        let sim = small().build().unwrap();
        assert_eq!(sim.engine().post("m0_post_0").unwrap().rating, 1900.0);
        assert_eq!(sim.engine().post("m0_post_2").unwrap().rating, 1500.0);

        let mut scenario = small();
        scenario.initial_ratings.insert("nowhere".to_string(), 1600.0);
        assert!(scenario.validate().is_err());
    }

    #[test]
    fn test_run_small_scenario() {
        let scenario = small();
        let mut sim = scenario.build().unwrap();
        assert_eq!(sim.engine().curators().count(), 12);
        assert_eq!(sim.subscribers(0), 18);
        assert_eq!(sim.subscribers(2), 23);

        let summary = sim.run(scenario.rounds).unwrap();
        assert_eq!(summary.rounds, 3);
        assert_eq!(summary.strategies["honest"].curators, 6);
        assert_eq!(summary.strategies["sybil farm"].curators, 4);
        assert_eq!(summary.strategies["whale"].curators, 1);
        assert!(summary.pool.balance >= 0.0);
        assert_eq!(summary.active_readers, 3);
        assert_eq!(sim.engine().posts().count(), 30);
        assert_eq!(summary.last_digest.as_ref().map(String::len), Some(64));

        let text = summary.to_string();
        assert!(text.contains("Scenario: small (3 rounds)"));
        assert!(text.contains("lazy"));
    }

    #[test]
    fn test_same_seed_same_summary() {
        let scenario = small();
        let a = scenario.build().unwrap().run(3).unwrap();
        let b = scenario.build().unwrap().run(3).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_churning_readers_reduce_demand() {
        let mut scenario = small();
        // Any feed below 0.6 quality loses these readers after round 0.
        scenario.readers = vec![ReaderSpec {
            count: 5,
            behavior: Reader::churning(1.0),
        }];
        let mut sim = scenario.build().unwrap();
        assert_eq!(sim.subscribers(0), 20);
        sim.step().unwrap();
        assert_eq!(sim.readers().churned(), 5);
        assert_eq!(sim.subscribers(1), 15);
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SMALL.as_bytes()).unwrap();
        let scenario = Scenario::from_path(file.path()).unwrap();
        assert_eq!(scenario.name, "small");

        let err = Scenario::from_path("/no/such/scenario.json").unwrap_err();
        assert!(err.to_string().contains("reading scenario"));
    }
}
