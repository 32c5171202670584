//! Coordinated groups: several curator identities, one decision per pair.
//!
//! The group decides the first time any member is asked about a ballot and
//! every later member gets the stored answer. Decisions are held once per
//! group, not copied per member, and only for the round in progress.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::trace;

use market_ledger::{CuratorId, Vote};

use crate::error::{Result, StrategyError};
use crate::strategy::{clamp_probability, coin_flip, pick, Ballot};

/// Index of a group within a [`StrategyBook`](crate::StrategyBook).
pub type GroupId = usize;

/// What kind of coordination a group represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    /// Independent curators voting as a bloc. On a miss the bloc picks a
    /// random side.
    CollusionRing,
    /// One actor behind many identities. On a miss the farm votes the
    /// wrong side.
    SybilFarm,
}

impl GroupKind {
    /// Allowed member count, inclusive.
    pub fn size_bounds(&self) -> (usize, usize) {
        match self {
            GroupKind::CollusionRing => (5, 10),
            GroupKind::SybilFarm => (2, 64),
        }
    }

    /// Allowed accuracy range, inclusive.
    pub fn accuracy_bounds(&self) -> (f64, f64) {
        match self {
            GroupKind::CollusionRing => (0.0, 1.0),
            GroupKind::SybilFarm => (0.60, 0.70),
        }
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKind::CollusionRing => write!(f, "collusion ring"),
            GroupKind::SybilFarm => write!(f, "sybil farm"),
        }
    }
}

/// A set of curators sharing one decision table.
#[derive(Debug, Clone)]
pub struct CoordinatedGroup {
    kind: GroupKind,
    members: BTreeSet<CuratorId>,
    accuracy: f64,
    round_id: Option<u64>,
    decisions: BTreeMap<usize, Vote>,
    decided: usize,
}

impl CoordinatedGroup {
    /// Creates a group. Duplicate member ids count once.
    ///
    /// # Errors
    ///
    /// [`StrategyError::InvalidGroupSize`] if the distinct member count is
    /// outside [`GroupKind::size_bounds`].
    pub fn new<I, S>(kind: GroupKind, members: I, accuracy: f64) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<CuratorId>,
    {
        let members: BTreeSet<CuratorId> = members.into_iter().map(Into::into).collect();
        let (min, max) = kind.size_bounds();
        if members.len() < min || members.len() > max {
            return Err(StrategyError::InvalidGroupSize {
                kind,
                size: members.len(),
                min,
                max,
            });
        }
        let (lo, hi) = kind.accuracy_bounds();
        Ok(Self {
            kind,
            members,
            accuracy: clamp_probability(accuracy, lo, hi),
            round_id: None,
            decisions: BTreeMap::new(),
            decided: 0,
        })
    }

    /// A collusion ring of 5–10 members.
    ///
    /// # Errors
    ///
    /// See [`CoordinatedGroup::new`].
    pub fn collusion_ring<I, S>(members: I, accuracy: f64) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<CuratorId>,
    {
        Self::new(GroupKind::CollusionRing, members, accuracy)
    }

    /// A sybil farm of 2–64 identities, accuracy clamped to `[0.60, 0.70]`.
    ///
    /// # Errors
    ///
    /// See [`CoordinatedGroup::new`].
    pub fn sybil_farm<I, S>(identities: I, accuracy: f64) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<CuratorId>,
    {
        Self::new(GroupKind::SybilFarm, identities, accuracy)
    }

    /// Group kind.
    pub fn kind(&self) -> GroupKind {
        self.kind
    }

    /// Accuracy after clamping.
    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }

    /// Returns true if `curator_id` belongs to the group.
    pub fn is_member(&self, curator_id: &str) -> bool {
        self.members.contains(curator_id)
    }

    /// Member ids in sorted order.
    pub fn members(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(String::as_str)
    }

    /// Number of ballots decided over the group's lifetime.
    pub fn decisions_made(&self) -> usize {
        self.decided
    }

    /// Decisions held for the current round.
    pub fn pending_decisions(&self) -> usize {
        self.decisions.len()
    }

    /// The group's vote on `ballot`, deciding it on first request. A
    /// ballot from a new round discards the previous round's decisions.
    ///
    /// # Errors
    ///
    /// [`StrategyError::NotAMember`] if `curator_id` is not in the group.
    pub fn decide<R: Rng + ?Sized>(
        &mut self,
        group_id: GroupId,
        ballot: &Ballot<'_>,
        curator_id: &str,
        rng: &mut R,
    ) -> Result<Vote> {
        if !self.is_member(curator_id) {
            return Err(StrategyError::NotAMember {
                curator_id: curator_id.to_string(),
                group: group_id,
            });
        }
        if self.round_id != Some(ballot.round_id) {
            self.decisions.clear();
            self.round_id = Some(ballot.round_id);
        }
        if let Some(vote) = self.decisions.get(&ballot.seq) {
            return Ok(*vote);
        }

        let correct = ballot.higher_rated().unwrap_or_else(|| coin_flip(rng));
        let vote = match self.kind {
            GroupKind::CollusionRing => {
                if rng.gen_bool(self.accuracy) {
                    correct
                } else {
                    coin_flip(rng)
                }
            }
            GroupKind::SybilFarm => pick(correct, self.accuracy, rng),
        };
        trace!(group = group_id, round_id = ballot.round_id, seq = ballot.seq, %vote, "group decision");
        self.decisions.insert(ballot.seq, vote);
        self.decided += 1;
        Ok(vote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use market_ledger::Post;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ids(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{prefix}{i}")).collect()
    }

    #[test]
    fn test_ring_size_limits() {
        assert!(CoordinatedGroup::collusion_ring(ids("r", 4), 0.6).is_err());
        assert!(CoordinatedGroup::collusion_ring(ids("r", 5), 0.6).is_ok());
        assert!(CoordinatedGroup::collusion_ring(ids("r", 10), 0.6).is_ok());
        assert!(matches!(
            CoordinatedGroup::collusion_ring(ids("r", 11), 0.6),
            Err(StrategyError::InvalidGroupSize { size: 11, .. })
        ));
    }

    #[test]
    fn test_duplicate_members_count_once() {
        let members = vec!["a", "a", "b", "c", "d"];
        assert!(CoordinatedGroup::collusion_ring(members, 0.6).is_err());
    }

    #[test]
    fn test_sybil_limits_and_accuracy() {
        assert!(CoordinatedGroup::sybil_farm(ids("s", 1), 0.65).is_err());
        assert!(CoordinatedGroup::sybil_farm(ids("s", 65), 0.65).is_err());
        let farm = CoordinatedGroup::sybil_farm(ids("s", 64), 0.95).unwrap();
        assert_eq!(farm.accuracy(), 0.70);
    }

    #[test]
    fn test_members_share_one_decision() {
        let mut ring = CoordinatedGroup::collusion_ring(ids("r", 7), 0.6).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let (left, right) = (Post::with_rating("a", "", 1400.0), Post::with_rating("b", "", 1600.0));
        for seq in 0..20 {
            let ballot = Ballot::new(0, seq, &left, &right);
            let first = ring.decide(0, &ballot, "r0", &mut rng).unwrap();
            for member in ids("r", 7) {
                assert_eq!(ring.decide(0, &ballot, &member, &mut rng).unwrap(), first);
            }
        }
        assert_eq!(ring.decisions_made(), 20);
    }

    #[test]
    fn test_outsider_rejected() {
        let mut farm = CoordinatedGroup::sybil_farm(ids("s", 3), 0.65).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let (a, b) = (Post::new("a", ""), Post::new("b", ""));
        let err = farm.decide(4, &Ballot::new(0, 0, &a, &b), "honest_1", &mut rng).unwrap_err();
        assert!(matches!(err, StrategyError::NotAMember { group: 4, .. }));
        assert_eq!(farm.decisions_made(), 0);
    }

    #[test]
    fn test_decisions_dropped_when_round_changes() {
        let mut ring = CoordinatedGroup::collusion_ring(ids("r", 5), 0.6).unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        let (a, b) = (Post::new("a", ""), Post::new("b", ""));
        for round_id in 0..4 {
            for seq in 0..10 {
                ring.decide(0, &Ballot::new(round_id, seq, &a, &b), "r0", &mut rng).unwrap();
                ring.decide(0, &Ballot::new(round_id, seq, &a, &b), "r1", &mut rng).unwrap();
            }
            assert_eq!(ring.pending_decisions(), 10);
        }
        assert_eq!(ring.decisions_made(), 40);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(GroupKind::SybilFarm.to_string(), "sybil farm");
    }
}
