//! Transitions and their history records

use crate::rollback::RollbackPlan;
use serde::Serialize;
use statecraft_core::{StateChange, Timestamp, TransitionId};
use std::fmt;

/// Classification of a transition from its (source, target) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionType {
    /// `inactive -> active`
    Activation,
    /// `active -> inactive`
    Deactivation,
    /// `* -> error`
    Failure,
    /// `error -> *`
    Recovery,
    /// source equals target
    Update,
    /// Anything else
    Transition,
}

impl TransitionType {
    /// Classify a (source, target) pair
    pub fn classify(source: &str, target: &str) -> Self {
        match (source, target) {
            (s, t) if s == t => TransitionType::Update,
            ("inactive", "active") => TransitionType::Activation,
            ("active", "inactive") => TransitionType::Deactivation,
            (_, "error") => TransitionType::Failure,
            ("error", _) => TransitionType::Recovery,
            _ => TransitionType::Transition,
        }
    }

    /// Stable lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionType::Activation => "activation",
            TransitionType::Deactivation => "deactivation",
            TransitionType::Failure => "failure",
            TransitionType::Recovery => "recovery",
            TransitionType::Update => "update",
            TransitionType::Transition => "transition",
        }
    }
}

impl fmt::Display for TransitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transition lifecycle
///
/// ```text
/// initiated ──commit──► committing ──► completed
///     │                     │
///     │                     ├──► rolled_back
///     │                     └──► failed   (cycle / irreversible rollback)
///     └──abort──► rolled_back
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionStatus {
    /// Accepting changes
    Initiated,
    /// Commit in progress
    Committing,
    /// All changes applied and the new state installed
    Completed,
    /// Commit failed and could not be cleanly undone, or never started
    Failed,
    /// Commit failed and every applied change was reverted
    RolledBack,
}

impl TransitionStatus {
    /// Stable lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionStatus::Initiated => "initiated",
            TransitionStatus::Committing => "committing",
            TransitionStatus::Completed => "completed",
            TransitionStatus::Failed => "failed",
            TransitionStatus::RolledBack => "rolled_back",
        }
    }

    /// Whether the transition has finished
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransitionStatus::Completed | TransitionStatus::Failed | TransitionStatus::RolledBack
        )
    }
}

impl fmt::Display for TransitionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An in-flight transition (transaction)
#[derive(Debug, Clone)]
pub struct Transition {
    /// Identifier
    pub id: TransitionId,
    /// Classification of `source -> target`
    pub transition_type: TransitionType,
    /// Source status
    pub source: String,
    /// Target status
    pub target: String,
    /// Changes in add-order
    pub changes: Vec<StateChange>,
    /// Lifecycle status
    pub status: TransitionStatus,
    /// When the transition began
    pub started_at: Timestamp,
    /// When the transition finished
    pub ended_at: Option<Timestamp>,
    /// Caller-managed retry counter
    pub retries: u32,
}

/// Compact record of a finished transition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionRecord {
    /// Identifier
    pub id: TransitionId,
    /// Classification
    pub transition_type: TransitionType,
    /// Source status
    pub source: String,
    /// Target status
    pub target: String,
    /// Final status
    pub status: TransitionStatus,
    /// Number of changes
    pub change_count: usize,
    /// Store version the commit was based on
    pub base_version: Option<u64>,
    /// Store version installed by the commit
    pub committed_version: Option<u64>,
    /// Failure description
    pub error: Option<String>,
    /// Executed rollback plan, for commits that failed after applying
    pub rollback: Option<RollbackPlan>,
    /// When the transition began
    pub started_at: Timestamp,
    /// When the transition finished
    pub ended_at: Timestamp,
}
