use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, UserId};

/// Receipt / delivery status lifecycle.
///
/// ```text
/// Draft <-> Waiting <-> Ready
///   \          |          /
///    +----> Done | Cancelled   (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentStatus {
    Draft,
    Waiting,
    Ready,
    Done,
    Cancelled,
}

impl DocumentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentStatus::Draft => "Draft",
            DocumentStatus::Waiting => "Waiting",
            DocumentStatus::Ready => "Ready",
            DocumentStatus::Done => "Done",
            DocumentStatus::Cancelled => "Cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, DocumentStatus::Done | DocumentStatus::Cancelled)
    }

    /// The allowed-transition table.
    pub fn can_transition_to(self, next: DocumentStatus) -> bool {
        !self.is_terminal() && self != next
    }

    /// Check a transition, naming the document in the error.
    pub fn ensure_transition(self, next: DocumentStatus, what: &str) -> DomainResult<()> {
        match self {
            DocumentStatus::Done => Err(DomainError::invariant(format!("{what} is already completed"))),
            DocumentStatus::Cancelled => Err(DomainError::invariant(format!("{what} is cancelled"))),
            _ if !self.can_transition_to(next) => Err(DomainError::invariant(format!(
                "{what} is already {}",
                next.as_str()
            ))),
            _ => Ok(()),
        }
    }

    /// Terminal documents are immutable.
    pub fn ensure_editable(self, what: &str) -> DomainResult<()> {
        match self {
            DocumentStatus::Done => Err(DomainError::invariant(format!("cannot edit a completed {what}"))),
            DocumentStatus::Cancelled => Err(DomainError::invariant(format!("cannot edit a cancelled {what}"))),
            _ => Ok(()),
        }
    }
}

impl core::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(DocumentStatus::Draft),
            "waiting" => Ok(DocumentStatus::Waiting),
            "ready" => Ok(DocumentStatus::Ready),
            "done" => Ok(DocumentStatus::Done),
            "cancelled" | "canceled" => Ok(DocumentStatus::Cancelled),
            other => Err(DomainError::validation(format!("unknown status: {other}"))),
        }
    }
}

/// Command: ChangeStatus (any transition except completion).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeStatus {
    pub status: DocumentStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Complete (transition to Done; only issued while settling stock).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Complete {
    pub validated_by: UserId,
    pub occurred_at: DateTime<Utc>,
}
