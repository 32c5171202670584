//! A single comparison and the votes cast on it.
//!
//! Votes are keyed by curator id in a sorted map so every derived
//! partition comes out in a stable order, which keeps settlement
//! reproducible run to run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{LedgerError, Result};
use crate::models::{CuratorId, PairId, PostId};
use crate::vote::Vote;

/// Provenance of an audit pair: the earlier pair it repeats and the votes
/// curators cast there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditSource {
    /// Id of the pair being repeated.
    pub pair_id: PairId,
    /// Votes recorded on the source pair when it was settled.
    pub prior_votes: BTreeMap<CuratorId, Vote>,
}

/// Tally of votes on one pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    /// Votes for the left post.
    pub left: usize,
    /// Votes for the right post.
    pub right: usize,
    /// Explicit abstentions.
    pub no_reveal: usize,
}

impl VoteTally {
    /// Builds a tally from recorded votes.
    pub fn from_votes<'a>(votes: impl IntoIterator<Item = &'a Vote>) -> Self {
        let mut tally = Self::default();
        for vote in votes {
            match vote {
                Vote::Left => tally.left += 1,
                Vote::Right => tally.right += 1,
                Vote::NoReveal => tally.no_reveal += 1,
            }
        }
        tally
    }

    /// Number of revealed votes.
    pub fn revealed(&self) -> usize {
        self.left + self.right
    }

    /// Side with strictly more votes, or `None` on a tie.
    pub fn majority(&self) -> Option<Vote> {
        use std::cmp::Ordering;
        match self.left.cmp(&self.right) {
            Ordering::Greater => Some(Vote::Left),
            Ordering::Less => Some(Vote::Right),
            Ordering::Equal => None,
        }
    }
}

/// A comparison between two posts.
///
/// Mutable only while voting is open. [`freeze`](Self::freeze) is called
/// when settlement begins; afterwards [`add_vote`](Self::add_vote) fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pair {
    /// Unique pair identifier.
    pub id: PairId,
    /// Post shown on the left.
    pub post_left: PostId,
    /// Post shown on the right.
    pub post_right: PostId,
    votes: BTreeMap<CuratorId, Vote>,
    /// Curated calibration pair with a known answer.
    pub is_golden_set: bool,
    /// Known answer for golden-set pairs.
    pub golden_correct_answer: Option<Vote>,
    /// Re-shown pair used for consistency checks.
    pub is_audit_pair: bool,
    /// Source of an audit pair.
    pub audit_source: Option<AuditSource>,
    frozen: bool,
}

impl Pair {
    /// Creates a regular pair.
    pub fn new(id: impl Into<PairId>, post_left: impl Into<PostId>, post_right: impl Into<PostId>) -> Self {
        Self {
            id: id.into(),
            post_left: post_left.into(),
            post_right: post_right.into(),
            votes: BTreeMap::new(),
            is_golden_set: false,
            golden_correct_answer: None,
            is_audit_pair: false,
            audit_source: None,
            frozen: false,
        }
    }

    /// Creates a golden-set pair with a known answer.
    pub fn golden(
        id: impl Into<PairId>,
        post_left: impl Into<PostId>,
        post_right: impl Into<PostId>,
        answer: Vote,
    ) -> Self {
        let mut pair = Self::new(id, post_left, post_right);
        pair.is_golden_set = true;
        pair.golden_correct_answer = Some(answer);
        pair
    }

    /// Creates an audit pair repeating `source`'s posts. The source votes
    /// are carried along for consistency scoring.
    pub fn audit(id: impl Into<PairId>, source: AuditSource, post_left: impl Into<PostId>, post_right: impl Into<PostId>) -> Self {
        let mut pair = Self::new(id, post_left, post_right);
        pair.is_audit_pair = true;
        pair.audit_source = Some(source);
        pair
    }

    /// Records a vote. A second vote from the same curator replaces the
    /// first.
    ///
    /// # Errors
    ///
    /// [`LedgerError::PairFrozen`] once settlement has begun.
    pub fn add_vote(&mut self, curator_id: impl Into<CuratorId>, vote: Vote) -> Result<()> {
        if self.frozen {
            return Err(LedgerError::PairFrozen {
                pair_id: self.id.clone(),
            });
        }
        self.votes.insert(curator_id.into(), vote);
        Ok(())
    }

    /// Closes the pair to further votes.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Returns true once votes are closed.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// All recorded votes, sorted by curator id.
    pub fn votes(&self) -> &BTreeMap<CuratorId, Vote> {
        &self.votes
    }

    /// A curator's recorded vote. Missing votes read as `NoReveal`.
    pub fn vote_of(&self, curator_id: &str) -> Vote {
        self.votes.get(curator_id).copied().unwrap_or(Vote::NoReveal)
    }

    /// Tally of recorded votes.
    pub fn tally(&self) -> VoteTally {
        VoteTally::from_votes(self.votes.values())
    }

    /// Side with strictly more votes; `None` on a tie (including no votes).
    pub fn majority_vote(&self) -> Option<Vote> {
        self.tally().majority()
    }

    /// Curators who voted with the majority. Empty on a tie.
    pub fn majority_voters(&self) -> Vec<CuratorId> {
        match self.majority_vote() {
            Some(side) => self.voters_for(side),
            None => Vec::new(),
        }
    }

    /// Curators who voted the non-majority side. Empty on a tie.
    pub fn minority_voters(&self) -> Vec<CuratorId> {
        match self.majority_vote().and_then(|side| side.opposite()) {
            Some(side) => self.voters_for(side),
            None => Vec::new(),
        }
    }

    /// Roster members who did not reveal a vote on this pair.
    pub fn no_reveal_voters<'a>(&self, roster: impl IntoIterator<Item = &'a str>) -> Vec<CuratorId> {
        roster
            .into_iter()
            .filter(|id| !self.vote_of(id).is_revealed())
            .map(str::to_string)
            .collect()
    }

    /// Winning and losing post ids for a decided side.
    pub fn winner_loser(&self, side: Vote) -> Option<(&PostId, &PostId)> {
        match side {
            Vote::Left => Some((&self.post_left, &self.post_right)),
            Vote::Right => Some((&self.post_right, &self.post_left)),
            Vote::NoReveal => None,
        }
    }

    /// Snapshot of this pair usable as an audit source.
    pub fn as_audit_source(&self) -> AuditSource {
        AuditSource {
            pair_id: self.id.clone(),
            prior_votes: self.votes.clone(),
        }
    }

    fn voters_for(&self, side: Vote) -> Vec<CuratorId> {
        self.votes
            .iter()
            .filter(|(_, vote)| **vote == side)
            .map(|(id, _)| id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voted(votes: &[(&str, Vote)]) -> Pair {
        let mut pair = Pair::new("pair_0_0", "a", "b");
        for (id, vote) in votes {
            pair.add_vote(*id, *vote).unwrap();
        }
        pair
    }

    #[test]
    fn test_majority_left() {
        let pair = voted(&[("c1", Vote::Left), ("c2", Vote::Left), ("c3", Vote::Right)]);
        assert_eq!(pair.majority_vote(), Some(Vote::Left));
        assert_eq!(pair.majority_voters(), vec!["c1", "c2"]);
        assert_eq!(pair.minority_voters(), vec!["c3"]);
    }

    #[test]
    fn test_tie_is_undefined() {
        let pair = voted(&[("c1", Vote::Left), ("c2", Vote::Right), ("c3", Vote::NoReveal)]);
        assert_eq!(pair.majority_vote(), None);
        assert!(pair.minority_voters().is_empty());
        assert!(pair.majority_voters().is_empty());
    }

    #[test]
    fn test_empty_pair_is_tie() {
        let pair = Pair::new("p", "a", "b");
        assert_eq!(pair.majority_vote(), None);
    }

    #[test]
    fn test_last_write_wins() {
        let mut pair = Pair::new("p", "a", "b");
        pair.add_vote("c1", Vote::Left).unwrap();
        pair.add_vote("c1", Vote::Right).unwrap();
        assert_eq!(pair.votes().len(), 1);
        assert_eq!(pair.vote_of("c1"), Vote::Right);
    }

    #[test]
    fn test_frozen_rejects_votes() {
        let mut pair = Pair::new("p", "a", "b");
        pair.freeze();
        let err = pair.add_vote("c1", Vote::Left).unwrap_err();
        assert!(matches!(err, LedgerError::PairFrozen { .. }));
    }

    #[test]
    fn test_no_reveal_includes_missing_and_explicit() {
        let pair = voted(&[("c1", Vote::Left), ("c2", Vote::NoReveal)]);
        let roster = ["c1", "c2", "c3"];
        assert_eq!(pair.no_reveal_voters(roster), vec!["c2", "c3"]);
    }

    #[test]
    fn test_winner_loser() {
        let pair = Pair::new("p", "a", "b");
        assert_eq!(pair.winner_loser(Vote::Right), Some((&"b".to_string(), &"a".to_string())));
        assert_eq!(pair.winner_loser(Vote::NoReveal), None);
    }

    #[test]
    fn test_golden_and_audit_flags() {
        let golden = Pair::golden("g", "a", "b", Vote::Left);
        assert!(golden.is_golden_set);
        assert_eq!(golden.golden_correct_answer, Some(Vote::Left));

        let source = voted(&[("c1", Vote::Right)]).as_audit_source();
        let audit = Pair::audit("x", source, "a", "b");
        assert!(audit.is_audit_pair);
        assert!(!audit.is_golden_set);
        let prior = &audit.audit_source.as_ref().unwrap().prior_votes;
        assert_eq!(prior.get("c1"), Some(&Vote::Right));
    }

    #[test]
    fn test_tally_counts() {
        let tally = voted(&[("c1", Vote::Left), ("c2", Vote::NoReveal), ("c3", Vote::Right)]).tally();
        assert_eq!(tally.left, 1);
        assert_eq!(tally.right, 1);
        assert_eq!(tally.no_reveal, 1);
        assert_eq!(tally.revealed(), 2);
    }
}
