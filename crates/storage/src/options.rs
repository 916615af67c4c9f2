//! State store options

use serde::{Deserialize, Serialize};

/// Bounds for the store's retained logs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    /// Maximum superseded states kept as snapshots
    pub max_state_history: usize,
    /// Maximum entries in the transition log
    pub max_transition_log: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        StoreOptions {
            max_state_history: 100,
            max_transition_log: 1000,
        }
    }
}

impl StoreOptions {
    /// Override the snapshot history bound
    pub fn with_max_state_history(mut self, max: usize) -> Self {
        self.max_state_history = max;
        self
    }
}
