//! Bounded integrity score.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A curator's integrity, from 0.0 (no trust) to 1.0 (fully consistent).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct IntegrityScore(f64);

impl IntegrityScore {
    /// Creates a score, clamping into `[0, 1]`. NaN becomes 0.
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self::zero();
        }
        Self(value.clamp(0.0, 1.0))
    }

    /// Returns the score value.
    pub fn value(&self) -> f64 {
        self.0
    }

    /// Returns true if the score is strictly below `threshold`.
    pub fn is_below(&self, threshold: f64) -> bool {
        self.0 < threshold
    }

    /// Lowest score.
    pub fn zero() -> Self {
        Self(0.0)
    }

    /// Highest score.
    pub fn perfect() -> Self {
        Self(1.0)
    }
}

impl Default for IntegrityScore {
    fn default() -> Self {
        Self::perfect()
    }
}

impl fmt::Display for IntegrityScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}%", self.0 * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamped() {
        assert_eq!(IntegrityScore::new(1.7).value(), 1.0);
        assert_eq!(IntegrityScore::new(-0.2).value(), 0.0);
        assert_eq!(IntegrityScore::new(f64::NAN).value(), 0.0);
    }

    #[test]
    fn test_threshold() {
        let score = IntegrityScore::new(0.45);
        assert!(score.is_below(0.5));
        assert!(!score.is_below(0.45));
    }

    #[test]
    fn test_display() {
        assert_eq!(IntegrityScore::new(0.875).to_string(), "87.5%");
    }
}
