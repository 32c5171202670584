//! Curator-to-strategy assignments.

use rand::rngs::StdRng;
use std::collections::BTreeMap;

use market_ledger::{Curator, CuratorId, Vote};

use crate::error::{Result, StrategyError};
use crate::group::{CoordinatedGroup, GroupId};
use crate::strategy::{Ballot, Strategy, VoteSource};

/// Maps curators to strategies and owns the coordinated groups they
/// reference.
#[derive(Debug, Clone, Default)]
pub struct StrategyBook {
    assignments: BTreeMap<CuratorId, Strategy>,
    groups: Vec<CoordinatedGroup>,
}

impl StrategyBook {
    /// Creates an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a group and returns its id.
    pub fn add_group(&mut self, group: CoordinatedGroup) -> GroupId {
        self.groups.push(group);
        self.groups.len() - 1
    }

    /// Assigns a strategy, replacing any previous one.
    ///
    /// # Errors
    ///
    /// For [`Strategy::Coordinated`]: [`StrategyError::UnknownGroup`] if the
    /// group is not registered, [`StrategyError::NotAMember`] if the curator
    /// is not one of its members.
    pub fn assign(&mut self, curator_id: impl Into<CuratorId>, strategy: Strategy) -> Result<()> {
        let curator_id = curator_id.into();
        if let Some(group_id) = strategy.group() {
            let group = self
                .groups
                .get(group_id)
                .ok_or(StrategyError::UnknownGroup(group_id))?;
            if !group.is_member(&curator_id) {
                return Err(StrategyError::NotAMember {
                    curator_id,
                    group: group_id,
                });
            }
        }
        self.assignments.insert(curator_id, strategy);
        Ok(())
    }

    /// Registers a group and assigns every member to it.
    ///
    /// ```rust
    /// use market_strategy::{CoordinatedGroup, StrategyBook};
    ///
    /// let mut book = StrategyBook::new();
    /// let farm = CoordinatedGroup::sybil_farm(["s0", "s1", "s2"], 0.65)?;
    /// let id = book.enroll_group(farm);
    /// assert_eq!(book.strategy_of("s1").and_then(|s| s.group()), Some(id));
    /// # Ok::<(), market_strategy::StrategyError>(())
    /// ```
    pub fn enroll_group(&mut self, group: CoordinatedGroup) -> GroupId {
        let members: Vec<CuratorId> = group.members().map(str::to_string).collect();
        let id = self.add_group(group);
        for member in members {
            self.assignments.insert(member, Strategy::Coordinated { group: id });
        }
        id
    }

    /// Strategy assigned to a curator.
    pub fn strategy_of(&self, curator_id: &str) -> Option<&Strategy> {
        self.assignments.get(curator_id)
    }

    /// A registered group.
    pub fn group(&self, id: GroupId) -> Option<&CoordinatedGroup> {
        self.groups.get(id)
    }

    /// All assignments in curator-id order.
    pub fn assignments(&self) -> impl Iterator<Item = (&str, &Strategy)> {
        self.assignments.iter().map(|(id, s)| (id.as_str(), s))
    }

    /// Number of assigned curators.
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    /// Returns true when nobody is assigned.
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

impl VoteSource for StrategyBook {
    fn vote(&mut self, ballot: &Ballot<'_>, curator: &Curator, rng: &mut StdRng) -> Result<Vote> {
        let strategy = self
            .assignments
            .get(&curator.id)
            .ok_or_else(|| StrategyError::Unassigned(curator.id.clone()))?;

        match strategy.group() {
            Some(group_id) => self
                .groups
                .get_mut(group_id)
                .ok_or(StrategyError::UnknownGroup(group_id))?
                .decide(group_id, ballot, &curator.id, rng),
            None => Ok(strategy.independent_vote(ballot, rng).unwrap_or(Vote::NoReveal)),
        }
    }
}
