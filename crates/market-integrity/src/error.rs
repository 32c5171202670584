//! Error types for integrity monitoring.

use thiserror::Error;

/// Result type alias for integrity operations.
pub type Result<T> = std::result::Result<T, IntegrityError>;

/// Errors raised by the integrity monitor.
#[derive(Debug, Error)]
pub enum IntegrityError {
    /// A configuration value is out of range or inconsistent with another.
    #[error("invalid integrity config: {field} {reason}")]
    InvalidConfig {
        /// Offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl IntegrityError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IntegrityError::invalid("slash_threshold", "must not exceed suspend_threshold");
        assert_eq!(
            err.to_string(),
            "invalid integrity config: slash_threshold must not exceed suspend_threshold"
        );
    }
}
