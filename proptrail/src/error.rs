//! Error types reported by property runs.

use std::time::Duration;

use thiserror::Error;

use crate::config::ConfigError;
use crate::path::PathError;

/// Why a run did not succeed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertyError {
    /// The predicate returned `false`
    #[error("Property failed by returning false")]
    Falsified,

    /// The predicate returned an error
    #[error("{message}")]
    PredicateFailed { message: String },

    /// The predicate panicked
    #[error("Property panicked: {message}")]
    PredicatePanicked { message: String },

    /// Generating or shrinking a value panicked: the arbitrary itself is broken
    #[error("Arbitrary failed: {message}")]
    ArbitraryFailed { message: String },

    /// Too many trials were rejected by preconditions
    #[error(
        "Failed to run property, too many pre-condition failures encountered ({num_skips} skipped, at most {max_skips} allowed)"
    )]
    TooManySkips { num_skips: usize, max_skips: usize },

    /// The run exceeded its time budget
    #[error("Property interrupted after {elapsed:?}")]
    Interrupted { elapsed: Duration },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Path(#[from] PathError),
}

impl PropertyError {
    /// Whether the error comes from the predicate rejecting a value, in which
    /// case the run carries a counterexample
    pub fn is_predicate_failure(&self) -> bool {
        matches!(
            self,
            PropertyError::Falsified
                | PropertyError::PredicateFailed { .. }
                | PropertyError::PredicatePanicked { .. }
        )
    }

    /// Create a predicate failure from any displayable error
    pub fn predicate_failed(message: impl Into<String>) -> Self {
        Self::PredicateFailed {
            message: message.into(),
        }
    }
}

/// Best-effort message of a panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            PropertyError::Falsified.to_string(),
            "Property failed by returning false"
        );
        assert_eq!(
            PropertyError::predicate_failed("boom").to_string(),
            "boom"
        );
        assert!(
            PropertyError::TooManySkips {
                num_skips: 10001,
                max_skips: 10000
            }
            .to_string()
            .starts_with("Failed to run property, too many pre-condition failures encountered")
        );
    }

    #[test]
    fn test_predicate_failure_classification() {
        assert!(PropertyError::Falsified.is_predicate_failure());
        assert!(
            PropertyError::PredicatePanicked {
                message: "x".into()
            }
            .is_predicate_failure()
        );
        assert!(
            !PropertyError::ArbitraryFailed {
                message: "x".into()
            }
            .is_predicate_failure()
        );
        assert!(!PropertyError::from(PathError::NoFailingTrial).is_predicate_failure());
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn std::any::Any + Send> = Box::new(5u8);
        assert_eq!(panic_message(payload.as_ref()), "Box<dyn Any>");
    }
}
