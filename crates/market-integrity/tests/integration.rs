//! # Integration Tests
//!
//! Multi-round behavior of IntegrityMonitor against honest, careless and
//! inconsistent curators.

use market_integrity::{IntegrityConfig, IntegrityMonitor};
use market_ledger::{Curator, Pair, Vote};

fn roster() -> Vec<Curator> {
    vec![
        Curator::new("honest", 1_000.0),
        Curator::new("flipper", 1_000.0),
        Curator::new("silent", 1_000.0),
    ]
}

/// One golden pair with answer Left, plus one audit pair re-showing the
/// previous round's regular pair.
fn round_pairs(round: usize, previous: Option<&Pair>) -> Vec<Pair> {
    let mut golden = Pair::golden(format!("golden_{round}_0"), "g_a", "g_b", Vote::Left);
    golden.add_vote("honest", Vote::Left).unwrap();
    golden.add_vote("flipper", Vote::Right).unwrap();
    golden.add_vote("silent", Vote::NoReveal).unwrap();

    let mut pairs = vec![golden];
    if let Some(prev) = previous {
        let mut audit = Pair::audit(
            format!("audit_{round}_1"),
            prev.as_audit_source(),
            prev.post_left.clone(),
            prev.post_right.clone(),
        );
        audit.add_vote("honest", prev.vote_of("honest")).unwrap();
        let flipped = prev.vote_of("flipper").opposite().unwrap_or(Vote::Left);
        audit.add_vote("flipper", flipped).unwrap();
        pairs.push(audit);
    }
    pairs
}

fn regular(round: usize) -> Pair {
    let mut pair = Pair::new(format!("pair_{round}_2"), "x", "y");
    pair.add_vote("honest", Vote::Left).unwrap();
    pair.add_vote("flipper", Vote::Left).unwrap();
    pair
}

#[test]
fn test_honest_curator_keeps_full_multiplier() {
    let mut monitor = IntegrityMonitor::new(IntegrityConfig::default()).unwrap();
    let curators = roster();
    let mut previous: Option<Pair> = None;

    for round in 0..8 {
        let mut pairs = round_pairs(round, previous.as_ref());
        let reg = regular(round);
        pairs.push(reg.clone());
        let verdicts = monitor.process_round_metrics(&pairs, &curators);
        assert_eq!(verdicts["honest"].score, 1.0);
        assert_eq!(verdicts["honest"].slash_amount, 0.0);
        previous = Some(reg);
    }
    assert_eq!(monitor.determine_reward_multiplier("honest"), 1.0);
}

#[test]
fn test_inconsistent_curator_suspended_and_slashed() {
    let mut monitor = IntegrityMonitor::new(IntegrityConfig::default()).unwrap();
    let curators = roster();
    let mut previous: Option<Pair> = None;
    let mut slashed_total = 0.0;

    for round in 0..6 {
        let mut pairs = round_pairs(round, previous.as_ref());
        let reg = regular(round);
        pairs.push(reg.clone());
        let verdicts = monitor.process_round_metrics(&pairs, &curators);
        slashed_total += verdicts["flipper"].slash_amount;
        previous = Some(reg);
    }

    assert_eq!(monitor.score_of("flipper").unwrap().value(), 0.0);
    assert!(monitor.is_suspended("flipper"));
    assert_eq!(monitor.determine_reward_multiplier("flipper"), 0.0);
    assert!(slashed_total > 0.0);
}

#[test]
fn test_silent_curator_is_never_penalised() {
    let mut monitor = IntegrityMonitor::new(IntegrityConfig::default()).unwrap();
    let curators = roster();
    for round in 0..12 {
        let verdicts = monitor.process_round_metrics(&round_pairs(round, None), &curators);
        assert!(!verdicts["silent"].should_suspend);
        assert_eq!(verdicts["silent"].slash_amount, 0.0);
    }
    assert_eq!(monitor.score_of("silent").unwrap().value(), 1.0);
}

#[test]
fn test_window_is_bounded() {
    let config = IntegrityConfig::new().with_window_rounds(4);
    let mut monitor = IntegrityMonitor::new(config).unwrap();
    let curators = roster();
    for round in 0..20 {
        monitor.process_round_metrics(&round_pairs(round, None), &curators);
    }
    let window = monitor.window_of("honest").unwrap();
    assert_eq!(window.len(), 4);
    assert_eq!(window.totals().golden_total, 4);
}

#[test]
fn test_scores_cover_every_participant() {
    let mut monitor = IntegrityMonitor::new(IntegrityConfig::default()).unwrap();
    monitor.process_round_metrics(&round_pairs(0, None), &roster());
    let scores = monitor.scores();
    assert_eq!(scores.len(), 3);
    assert_eq!(scores["flipper"], 0.0);
}

#[test]
fn test_config_from_partial_json() {
    let config: IntegrityConfig = serde_json::from_str(r#"{"window_rounds": 5, "slash_rate": 0.1}"#).unwrap();
    assert_eq!(config.window_rounds, 5);
    assert_eq!(config.slash_rate, 0.1);
    assert_eq!(config.suspend_threshold, IntegrityConfig::default().suspend_threshold);
    assert!(IntegrityMonitor::new(config.clone()).is_ok());

    let json = serde_json::to_string(&config).unwrap();
    let parsed: IntegrityConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, config);
}
