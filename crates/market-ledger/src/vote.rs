//! The three-way vote a curator casts on a pair.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A curator's choice on a pair.
///
/// Absence of a vote is treated exactly like [`Vote::NoReveal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Vote {
    /// The left post is better.
    Left,
    /// The right post is better.
    Right,
    /// Abstained or never revealed.
    NoReveal,
}

impl Vote {
    /// Returns true for `Left` and `Right`.
    pub fn is_revealed(&self) -> bool {
        !matches!(self, Vote::NoReveal)
    }

    /// Returns the other side. `NoReveal` has no opposite.
    pub fn opposite(&self) -> Option<Vote> {
        match self {
            Vote::Left => Some(Vote::Right),
            Vote::Right => Some(Vote::Left),
            Vote::NoReveal => None,
        }
    }
}

impl fmt::Display for Vote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vote::Left => write!(f, "LEFT"),
            Vote::Right => write!(f, "RIGHT"),
            Vote::NoReveal => write!(f, "NO_REVEAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revealed() {
        assert!(Vote::Left.is_revealed());
        assert!(Vote::Right.is_revealed());
        assert!(!Vote::NoReveal.is_revealed());
    }

    #[test]
    fn test_opposite() {
        assert_eq!(Vote::Left.opposite(), Some(Vote::Right));
        assert_eq!(Vote::Right.opposite(), Some(Vote::Left));
        assert_eq!(Vote::NoReveal.opposite(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Vote::NoReveal.to_string(), "NO_REVEAL");
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&Vote::Left).unwrap();
        assert!(json.contains("Left"));
    }
}
