//! Error types for the vote ledger.

use thiserror::Error;

use crate::round::RoundPhase;

/// Result type alias for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors raised when a ledger record is used outside its lifecycle.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A vote arrived after the pair was frozen for settlement.
    #[error("pair '{pair_id}' is frozen; votes are closed")]
    PairFrozen {
        /// Identifier of the frozen pair.
        pair_id: String,
    },

    /// An operation required a different round phase.
    #[error("round {round_id} is in phase {actual}, operation requires {expected}")]
    WrongPhase {
        /// Round identifier.
        round_id: u64,
        /// Phase the operation needs.
        expected: RoundPhase,
        /// Phase the round is actually in.
        actual: RoundPhase,
    },

    /// A phase transition skipped or reversed a step.
    #[error("round {round_id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Round identifier.
        round_id: u64,
        /// Current phase.
        from: RoundPhase,
        /// Requested phase.
        to: RoundPhase,
    },

    /// No pair with this id exists in the round.
    #[error("unknown pair '{0}'")]
    UnknownPair(String),

    /// The curator is not part of the round's participant snapshot.
    #[error("curator '{0}' is not a participant of this round")]
    UnknownCurator(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_frozen_display() {
        let err = LedgerError::PairFrozen {
            pair_id: "pair_3_1".to_string(),
        };
        assert!(err.to_string().contains("pair_3_1"));
    }

    #[test]
    fn test_wrong_phase_display() {
        let err = LedgerError::WrongPhase {
            round_id: 7,
            expected: RoundPhase::Voting,
            actual: RoundPhase::Archived,
        };
        let msg = err.to_string();
        assert!(msg.contains("VOTING"));
        assert!(msg.contains("ARCHIVED"));
    }

    #[test]
    fn test_unknown_curator_display() {
        let err = LedgerError::UnknownCurator("mallory".to_string());
        assert!(err.to_string().contains("mallory"));
    }
}
