//! Round records and their phase machine.
//!
//! A round moves strictly forward through
//! `PAIRING → CALIBRATION_INJECT → VOTING → SETTLEMENT → ARCHIVED`.
//! Pairs can be replaced only before voting opens, votes are accepted only
//! while voting is open, and entering settlement freezes every pair.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{LedgerError, Result};
use crate::models::Curator;
use crate::pair::Pair;
use crate::vote::Vote;

/// Lifecycle phase of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RoundPhase {
    /// Regular pairs are being generated.
    Pairing,
    /// Golden-set and audit pairs are being injected.
    CalibrationInject,
    /// Curators are voting.
    Voting,
    /// Rewards, ratings and integrity are being applied.
    Settlement,
    /// Settled and immutable.
    Archived,
}

impl RoundPhase {
    /// The phase that follows this one, if any.
    pub fn next(&self) -> Option<RoundPhase> {
        match self {
            RoundPhase::Pairing => Some(RoundPhase::CalibrationInject),
            RoundPhase::CalibrationInject => Some(RoundPhase::Voting),
            RoundPhase::Voting => Some(RoundPhase::Settlement),
            RoundPhase::Settlement => Some(RoundPhase::Archived),
            RoundPhase::Archived => None,
        }
    }
}

impl fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RoundPhase::Pairing => "PAIRING",
            RoundPhase::CalibrationInject => "CALIBRATION_INJECT",
            RoundPhase::Voting => "VOTING",
            RoundPhase::Settlement => "SETTLEMENT",
            RoundPhase::Archived => "ARCHIVED",
        };
        write!(f, "{name}")
    }
}

/// One round of comparisons.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Round {
    /// Sequential round number.
    pub id: u64,
    pairs: Vec<Pair>,
    curators: Vec<Curator>,
    phase: RoundPhase,
}

impl Round {
    /// Opens a round in `PAIRING` with a snapshot of the participants.
    pub fn new(id: u64, curators: Vec<Curator>) -> Self {
        Self {
            id,
            pairs: Vec::new(),
            curators,
            phase: RoundPhase::Pairing,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    /// Pairs in slot order.
    pub fn pairs(&self) -> &[Pair] {
        &self.pairs
    }

    /// Participant snapshot taken when the round opened.
    pub fn curators(&self) -> &[Curator] {
        &self.curators
    }

    /// Sum of participant stakes.
    pub fn total_stake(&self) -> f64 {
        self.curators.iter().map(|c| c.stake).sum()
    }

    /// Mutable access to the pair list while pairs may still be replaced.
    ///
    /// # Errors
    ///
    /// [`LedgerError::WrongPhase`] once voting has opened.
    pub fn pairs_mut(&mut self) -> Result<&mut Vec<Pair>> {
        match self.phase {
            RoundPhase::Pairing | RoundPhase::CalibrationInject => Ok(&mut self.pairs),
            actual => Err(LedgerError::WrongPhase {
                round_id: self.id,
                expected: RoundPhase::CalibrationInject,
                actual,
            }),
        }
    }

    /// Moves to the next phase. Entering `SETTLEMENT` freezes all pairs.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidTransition`] if `to` is not the immediate
    /// successor of the current phase.
    pub fn advance(&mut self, to: RoundPhase) -> Result<()> {
        if self.phase.next() != Some(to) {
            return Err(LedgerError::InvalidTransition {
                round_id: self.id,
                from: self.phase,
                to,
            });
        }
        if to == RoundPhase::Settlement {
            self.pairs.iter_mut().for_each(Pair::freeze);
        }
        self.phase = to;
        Ok(())
    }

    /// Records a vote on a pair of this round.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::WrongPhase`] outside `VOTING`
    /// - [`LedgerError::UnknownCurator`] for non-participants
    /// - [`LedgerError::UnknownPair`] for a pair id not in this round
    pub fn record_vote(&mut self, pair_id: &str, curator_id: &str, vote: Vote) -> Result<()> {
        if self.phase != RoundPhase::Voting {
            return Err(LedgerError::WrongPhase {
                round_id: self.id,
                expected: RoundPhase::Voting,
                actual: self.phase,
            });
        }
        if !self.curators.iter().any(|c| c.id == curator_id) {
            return Err(LedgerError::UnknownCurator(curator_id.to_string()));
        }
        let pair = self
            .pairs
            .iter_mut()
            .find(|p| p.id == pair_id)
            .ok_or_else(|| LedgerError::UnknownPair(pair_id.to_string()))?;
        pair.add_vote(curator_id, vote)
    }
}
