//! Transition coordinator options

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::time::Duration;

/// Transition coordinator options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorOptions {
    /// Maximum transitions in flight (begun, not yet finished)
    pub max_transitions: usize,
    /// Maximum records kept in the transition history
    pub max_history: usize,
    /// Apply changes in add-order on the committing thread
    pub atomic_mode: bool,
    /// Deadline for a single commit, measured from its start
    #[serde(rename = "timeout_ms", with = "statecraft_core::duration::option_millis")]
    pub timeout: Option<Duration>,
    /// Retry budget exposed to callers; the coordinator never retries
    pub retry_limit: u32,
    /// Worker threads per concurrent commit, including the committing
    /// thread; `None` uses the available parallelism
    pub max_workers: Option<usize>,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        CoordinatorOptions {
            max_transitions: 64,
            max_history: 1000,
            atomic_mode: true,
            timeout: None,
            retry_limit: 3,
            max_workers: None,
        }
    }
}

impl CoordinatorOptions {
    /// Ordered, single-threaded application
    pub fn atomic() -> Self {
        CoordinatorOptions {
            atomic_mode: true,
            ..Default::default()
        }
    }

    /// Dependency-gated application on worker threads
    pub fn concurrent() -> Self {
        CoordinatorOptions {
            atomic_mode: false,
            ..Default::default()
        }
    }

    /// Set the commit deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Cap the worker threads of a concurrent commit
    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = Some(workers);
        self
    }

    /// Workers for a commit of `changes` changes, at least one
    pub fn workers_for(&self, changes: usize) -> usize {
        let limit = self.max_workers.unwrap_or_else(|| {
            std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
        });
        limit.min(changes).max(1)
    }
}
