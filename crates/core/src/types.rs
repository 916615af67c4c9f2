//! Identifier types used across the workspace
//!
//! - [`TransitionId`]: Unique identifier for a transition (transaction)
//! - [`ChangeId`]: Position of a change inside its transition
//! - [`SnapshotId`]: Unique identifier for a retained state snapshot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Wall-clock timestamp (UTC)
pub type Timestamp = DateTime<Utc>;

/// Unique identifier for a transition
///
/// TransitionId is used in:
/// - Coordinator lookups (`add_change`, `commit_transition`, ...)
/// - Pending changes materialized at commit time
/// - The bounded transition history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransitionId(Uuid);

impl TransitionId {
    /// Create a new random TransitionId using UUID v4
    ///
    /// # Examples
    ///
    /// ```
    /// use statecraft_core::TransitionId;
    ///
    /// let id1 = TransitionId::new();
    /// let id2 = TransitionId::new();
    /// assert_ne!(id1, id2);
    /// ```
    pub fn new() -> Self {
        TransitionId(Uuid::new_v4())
    }
}

impl Default for TransitionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransitionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a change within one transition
///
/// Changes are numbered in add-order starting at 0, so comparing two
/// ChangeIds of the same transition compares their add-order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChangeId(pub u32);

impl ChangeId {
    /// Add-order index of this change
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for ChangeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "change#{}", self.0)
    }
}

/// Unique identifier for a retained state snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotId(Uuid);

impl SnapshotId {
    /// Create a new random SnapshotId
    pub fn new() -> Self {
        SnapshotId(Uuid::new_v4())
    }
}

impl Default for SnapshotId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Current wall-clock time
pub fn now() -> Timestamp {
    Utc::now()
}
