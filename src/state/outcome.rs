/// Outcome definitions for a single fetch attempt
use std::fmt;

/// Result of fetching one work item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// The fetch capability reported success
    Success,

    /// The fetch failed, timed out, or its worker panicked
    Failure {
        /// Human-readable cause, logged and shown to the operator
        reason: String,
    },
}

impl ItemOutcome {
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }

    /// Returns true if the item should be recorded as completed
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Returns the failure reason, if any
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Success => None,
            Self::Failure { reason } => Some(reason),
        }
    }
}

impl fmt::Display for ItemOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure { reason } => write!(f, "failure: {}", reason),
        }
    }
}
