//! Rollback plans
//!
//! A plan is created empty when a transition begins and gains one step per
//! added change. On a failed commit, steps of applied changes run in the
//! reverse of the order the changes applied (reverse index order in
//! atomic mode); steps of changes that never applied are skipped.

use serde::Serialize;
use statecraft_core::{now, ChangeId, StateChange, Timestamp, TransitionId, Value};
use std::collections::BTreeMap;

/// Status of one rollback step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Not executed
    Pending,
    /// The change was reverted
    Completed,
    /// The change never applied, nothing to revert
    Skipped,
    /// Reverting failed
    Failed,
}

/// Undo step for one change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollbackStep {
    /// Change this step reverts
    pub change_id: ChangeId,
    /// Always `"revert"`
    pub action: String,
    /// Target and the values to swap
    pub parameters: BTreeMap<String, Value>,
    /// Execution status
    pub status: StepStatus,
}

/// Undo steps of one transition, in change order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollbackPlan {
    /// Owning transition
    pub transition_id: TransitionId,
    /// One step per change
    pub steps: Vec<RollbackStep>,
    /// When the plan was created
    pub created_at: Timestamp,
}

impl RollbackPlan {
    /// Empty plan for a new transition
    pub fn new(transition_id: TransitionId) -> Self {
        Self {
            transition_id,
            steps: Vec::new(),
            created_at: now(),
        }
    }

    /// Append the step reverting `change`
    pub fn push(&mut self, change_id: ChangeId, change: &StateChange) {
        let mut parameters = BTreeMap::new();
        parameters.insert("target".to_string(), Value::from(change.target.as_str()));
        parameters.insert("restore".to_string(), change.old_value.clone());
        parameters.insert("discard".to_string(), change.new_value.clone());
        self.steps.push(RollbackStep {
            change_id,
            action: "revert".to_string(),
            parameters,
            status: StepStatus::Pending,
        });
    }

    /// Number of steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if the plan has no steps
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
