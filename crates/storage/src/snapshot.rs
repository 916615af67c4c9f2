//! Retained history entries
//!
//! A [`StateSnapshot`] captures a superseded state. The state is shared
//! behind an `Arc` and never mutated after it stops being current, so
//! handing snapshots out to readers is cheap.

use serde::Serialize;
use statecraft_core::{SnapshotId, SystemState, Timestamp};
use std::sync::Arc;

/// Immutable capture of a superseded state
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    /// Snapshot identifier, assigned when the state was installed
    pub id: SnapshotId,
    /// The superseded state
    pub state: Arc<SystemState>,
    /// When the state was superseded
    pub taken_at: Timestamp,
}

impl StateSnapshot {
    /// Version of the captured state
    pub fn version(&self) -> u64 {
        self.state.version
    }
}

/// Link between two consecutive states
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateTransitionLog {
    /// Snapshot ID of the superseded state
    pub from_snapshot: SnapshotId,
    /// Snapshot ID assigned to the new current state
    pub to_snapshot: SnapshotId,
    /// Version before the update
    pub from_version: u64,
    /// Version after the update
    pub to_version: u64,
    /// When the swap happened
    pub timestamp: Timestamp,
}
