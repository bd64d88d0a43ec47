//! Stack status enumeration and terminal-state classification
//!
//! Every status the stack-management API documents is listed explicitly.
//! Anything the API reports that is not in the list is kept verbatim as
//! [`StackStatus::Other`] and classified by its suffix.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Where a stack is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// A mutation is still running; keep polling
    InProgress,
    /// Terminal and healthy
    Succeeded,
    /// Terminal and unhealthy (failed or rolled back)
    Failed,
}

impl StatusClass {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StatusClass::InProgress)
    }
}

/// Status reported for a stack
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StackStatus {
    CreateInProgress,
    CreateFailed,
    CreateComplete,
    RollbackInProgress,
    RollbackFailed,
    RollbackComplete,
    DeleteInProgress,
    DeleteFailed,
    DeleteComplete,
    UpdateInProgress,
    UpdateCompleteCleanupInProgress,
    UpdateComplete,
    UpdateFailed,
    UpdateRollbackInProgress,
    UpdateRollbackFailed,
    UpdateRollbackCompleteCleanupInProgress,
    UpdateRollbackComplete,
    ReviewInProgress,
    ImportInProgress,
    ImportComplete,
    ImportRollbackInProgress,
    ImportRollbackFailed,
    ImportRollbackComplete,
    Other(String),
}

const KNOWN: &[(&str, StackStatus)] = &[
    ("CREATE_IN_PROGRESS", StackStatus::CreateInProgress),
    ("CREATE_FAILED", StackStatus::CreateFailed),
    ("CREATE_COMPLETE", StackStatus::CreateComplete),
    ("ROLLBACK_IN_PROGRESS", StackStatus::RollbackInProgress),
    ("ROLLBACK_FAILED", StackStatus::RollbackFailed),
    ("ROLLBACK_COMPLETE", StackStatus::RollbackComplete),
    ("DELETE_IN_PROGRESS", StackStatus::DeleteInProgress),
    ("DELETE_FAILED", StackStatus::DeleteFailed),
    ("DELETE_COMPLETE", StackStatus::DeleteComplete),
    ("UPDATE_IN_PROGRESS", StackStatus::UpdateInProgress),
    (
        "UPDATE_COMPLETE_CLEANUP_IN_PROGRESS",
        StackStatus::UpdateCompleteCleanupInProgress,
    ),
    ("UPDATE_COMPLETE", StackStatus::UpdateComplete),
    ("UPDATE_FAILED", StackStatus::UpdateFailed),
    ("UPDATE_ROLLBACK_IN_PROGRESS", StackStatus::UpdateRollbackInProgress),
    ("UPDATE_ROLLBACK_FAILED", StackStatus::UpdateRollbackFailed),
    (
        "UPDATE_ROLLBACK_COMPLETE_CLEANUP_IN_PROGRESS",
        StackStatus::UpdateRollbackCompleteCleanupInProgress,
    ),
    ("UPDATE_ROLLBACK_COMPLETE", StackStatus::UpdateRollbackComplete),
    ("REVIEW_IN_PROGRESS", StackStatus::ReviewInProgress),
    ("IMPORT_IN_PROGRESS", StackStatus::ImportInProgress),
    ("IMPORT_COMPLETE", StackStatus::ImportComplete),
    ("IMPORT_ROLLBACK_IN_PROGRESS", StackStatus::ImportRollbackInProgress),
    ("IMPORT_ROLLBACK_FAILED", StackStatus::ImportRollbackFailed),
    ("IMPORT_ROLLBACK_COMPLETE", StackStatus::ImportRollbackComplete),
];

impl StackStatus {
    /// Parse a status string as reported by the API
    pub fn parse(s: &str) -> Self {
        KNOWN
            .iter()
            .find(|(name, _)| *name == s)
            .map(|(_, status)| status.clone())
            .unwrap_or_else(|| StackStatus::Other(s.to_string()))
    }

    /// The wire representation of this status
    pub fn as_str(&self) -> &str {
        if let StackStatus::Other(s) = self {
            return s;
        }
        KNOWN
            .iter()
            .find(|(_, status)| status == self)
            .map(|(name, _)| *name)
            .unwrap_or("UNKNOWN")
    }

    /// Classify this status as in-progress, healthy or unhealthy
    pub fn classify(&self) -> StatusClass {
        use StackStatus::*;

        match self {
            CreateInProgress
            | RollbackInProgress
            | DeleteInProgress
            | UpdateInProgress
            | UpdateCompleteCleanupInProgress
            | UpdateRollbackInProgress
            | UpdateRollbackCompleteCleanupInProgress
            | ReviewInProgress
            | ImportInProgress
            | ImportRollbackInProgress => StatusClass::InProgress,

            CreateComplete | UpdateComplete | DeleteComplete | ImportComplete => {
                StatusClass::Succeeded
            }

            RollbackComplete | UpdateRollbackComplete | ImportRollbackComplete => {
                StatusClass::Failed
            }

            CreateFailed | RollbackFailed | DeleteFailed | UpdateFailed
            | UpdateRollbackFailed | ImportRollbackFailed => StatusClass::Failed,

            Other(s) => classify_by_suffix(s),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.classify().is_terminal()
    }
}

// Unknown statuses: a rollback that completed is still a failure.
fn classify_by_suffix(s: &str) -> StatusClass {
    if s.ends_with("_IN_PROGRESS") {
        StatusClass::InProgress
    } else if s.ends_with("ROLLBACK_COMPLETE") {
        StatusClass::Failed
    } else if s.ends_with("_COMPLETE") {
        StatusClass::Succeeded
    } else {
        StatusClass::Failed
    }
}

impl fmt::Display for StackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for StackStatus {
    fn from(s: &str) -> Self {
        StackStatus::parse(s)
    }
}

impl Serialize for StackStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for StackStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(StackStatus::parse(&s))
    }
}
