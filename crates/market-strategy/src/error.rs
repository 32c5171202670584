//! Error types for voting strategies.

use thiserror::Error;

use crate::group::{GroupId, GroupKind};

/// Result type alias for strategy operations.
pub type Result<T> = std::result::Result<T, StrategyError>;

/// Errors raised while building strategies or casting votes.
#[derive(Debug, Error)]
pub enum StrategyError {
    /// A coordinated group has too few or too many members.
    #[error("{kind} must have {min}-{max} members, got {size}")]
    InvalidGroupSize {
        /// Group kind.
        kind: GroupKind,
        /// Distinct members supplied.
        size: usize,
        /// Smallest allowed size.
        min: usize,
        /// Largest allowed size.
        max: usize,
    },

    /// A curator tried to vote through a group it does not belong to.
    #[error("curator '{curator_id}' is not a member of group {group}")]
    NotAMember {
        /// Offending curator.
        curator_id: String,
        /// Group it claimed.
        group: GroupId,
    },

    /// A strategy refers to a group that was never registered.
    #[error("unknown coordinated group {0}")]
    UnknownGroup(GroupId),

    /// No strategy is assigned to the curator.
    #[error("no strategy assigned to curator '{0}'")]
    Unassigned(String),
}
