//! Changes materialized at commit time

use serde::Serialize;
use smallvec::SmallVec;
use statecraft_core::{ChangeId, ChangeType, Timestamp, TransitionId};

/// Execution priority derived from the change type
///
/// Ordered so that `Critical < Important < Normal < Low`; lower runs first
/// when several changes are ready at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangePriority {
    /// Status changes
    Critical,
    /// Resource changes
    Important,
    /// Other built-in component and state changes
    Normal,
    /// Custom change types
    Low,
}

impl ChangePriority {
    /// Priority of a change type
    pub fn of(change_type: &ChangeType) -> Self {
        match change_type {
            ChangeType::State | ChangeType::ComponentStatus => ChangePriority::Critical,
            ChangeType::ResourceAllocation | ChangeType::ResourceUsage => ChangePriority::Important,
            ChangeType::ComponentInit
            | ChangeType::ComponentHealth
            | ChangeType::ComponentProperty
            | ChangeType::StateUpdate => ChangePriority::Normal,
            ChangeType::Custom(_) => ChangePriority::Low,
        }
    }
}

/// Execution status of a pending change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingStatus {
    /// Not started
    Pending,
    /// Executing
    Running,
    /// Applied to the working state
    Completed,
    /// Failed, or never ran because the commit was already failing
    Failed,
}

/// A change scheduled for execution
#[derive(Debug, Clone)]
pub struct PendingChange {
    /// Position in the transition
    pub id: ChangeId,
    /// Owning transition
    pub transition_id: TransitionId,
    /// Scheduling priority
    pub priority: ChangePriority,
    /// Changes that must complete first
    pub dependencies: SmallVec<[ChangeId; 4]>,
    /// Execution status
    pub status: PendingStatus,
    /// When the change was materialized
    pub created: Timestamp,
}
