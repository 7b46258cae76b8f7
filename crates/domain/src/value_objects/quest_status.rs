//! Quest progress states.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;

/// Status of one quest within a session.
///
/// Progression is monotonic in normal play: pending -> active -> completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QuestStatus {
    #[default]
    Pending,
    Active,
    Completed,
}

impl QuestStatus {
    /// Check that a transition only moves forward.
    ///
    /// Re-asserting the current status is allowed (activation is an
    /// idempotent batch write); moving backwards is not.
    pub fn transition(self, next: QuestStatus) -> Result<QuestStatus, DomainError> {
        if next >= self {
            Ok(next)
        } else {
            Err(DomainError::InvalidStateTransition(format!(
                "quest status cannot move from {self} back to {next}"
            )))
        }
    }

    /// Icon used in quest summaries rendered into persona prompts.
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Pending => "○",
            Self::Active => "▶",
            Self::Completed => "✓",
        }
    }
}

impl PartialOrd for QuestStatus {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QuestStatus {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        fn rank(s: &QuestStatus) -> u8 {
            match s {
                QuestStatus::Pending => 0,
                QuestStatus::Active => 1,
                QuestStatus::Completed => 2,
            }
        }
        rank(self).cmp(&rank(other))
    }
}

impl fmt::Display for QuestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Active => write!(f, "active"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_transitions_allowed() {
        assert!(QuestStatus::Pending.transition(QuestStatus::Active).is_ok());
        assert!(QuestStatus::Active
            .transition(QuestStatus::Completed)
            .is_ok());
        // Idempotent re-activation
        assert!(QuestStatus::Active.transition(QuestStatus::Active).is_ok());
    }

    #[test]
    fn backward_transitions_rejected() {
        assert!(QuestStatus::Completed
            .transition(QuestStatus::Active)
            .is_err());
        assert!(QuestStatus::Active
            .transition(QuestStatus::Pending)
            .is_err());
    }
}
