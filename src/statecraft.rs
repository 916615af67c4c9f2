//! Main entry point for statecraft
//!
//! The `Statecraft` struct wires a validation engine, a state store and a
//! transition coordinator together and exposes the common operations.

use crate::config::Config;
use crate::error::{Error, Result};
use statecraft_concurrency::{
    ChangeExecutor, CommitHandle, CoordinatorMetrics, TransitionCoordinator, TransitionRecord,
    TransitionStatus,
};
use statecraft_core::{ChangeId, StateChange, SystemState, TransitionId};
use statecraft_storage::{StateSnapshot, StateStore, Validator};
use statecraft_validation::{ValidationEngine, ValidationMetrics, ValidationRule};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Transactional state coordinator
///
/// # Example
///
/// ```ignore
/// use statecraft::prelude::*;
///
/// let sc = Statecraft::builder()
///     .lenient()
///     .initial_state(SystemState::new("prod"))
///     .build()?;
///
/// let version = sc.transition("inactive", "active", [
///     StateChange::status("api", "inactive", "active"),
/// ])?;
/// ```
pub struct Statecraft {
    engine: Arc<ValidationEngine>,
    store: Arc<StateStore>,
    coordinator: Arc<TransitionCoordinator>,
}

impl Statecraft {
    /// Create an instance with default options over `state`
    pub fn new(state: SystemState) -> Result<Self> {
        Self::builder().initial_state(state).build()
    }

    /// Create an instance from a TOML configuration file
    pub fn from_config_file(path: impl AsRef<Path>, state: SystemState) -> Result<Self> {
        Self::builder()
            .config(Config::from_file(path)?)
            .initial_state(state)
            .build()
    }

    /// Create a builder for custom configuration
    pub fn builder() -> StatecraftBuilder {
        StatecraftBuilder::new()
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Shared validation engine
    pub fn engine(&self) -> &Arc<ValidationEngine> {
        &self.engine
    }

    /// Shared state store
    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    /// Shared transition coordinator
    pub fn coordinator(&self) -> &Arc<TransitionCoordinator> {
        &self.coordinator
    }

    // =========================================================================
    // Rules and state
    // =========================================================================

    /// Register a validation rule
    pub fn register_rule(&self, rule: ValidationRule) -> Result<()> {
        Ok(self.engine.register_rule(rule)?)
    }

    /// Register a store-level validator
    pub fn register_validator(&self, name: impl Into<String>, validator: impl Validator + 'static) {
        self.store.register_validator(name, validator);
    }

    /// Install the first state; only needed when the builder had no
    /// initial state
    pub fn initialize(&self, state: SystemState) -> Result<()> {
        Ok(self.store.initialize(state)?)
    }

    /// Current state
    pub fn current_state(&self) -> Result<Arc<SystemState>> {
        Ok(self.store.get_current_state()?)
    }

    /// Current state version
    pub fn version(&self) -> Result<u64> {
        Ok(self.store.current_version()?)
    }

    /// Replace the current state directly, bypassing the coordinator
    pub fn update_state(&self, proposed: SystemState) -> Result<u64> {
        Ok(self.store.update_state(proposed)?)
    }

    /// Previous states, newest first
    pub fn state_history(&self, limit: usize) -> Vec<StateSnapshot> {
        self.store.get_history(limit)
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Begin a transition
    pub fn begin(&self, source: &str, target: &str) -> Result<TransitionId> {
        Ok(self.coordinator.begin_transition(source, target)?)
    }

    /// Add a change to an initiated transition
    pub fn add_change(&self, id: TransitionId, change: StateChange) -> Result<ChangeId> {
        Ok(self.coordinator.add_change(id, change)?)
    }

    /// Declare that `change` must run after `depends_on`
    pub fn add_dependency(
        &self,
        id: TransitionId,
        change: ChangeId,
        depends_on: ChangeId,
    ) -> Result<()> {
        Ok(self.coordinator.add_dependency(id, change, depends_on)?)
    }

    /// Commit a transition; returns the installed state version
    pub fn commit(&self, id: TransitionId) -> Result<u64> {
        Ok(self.coordinator.commit_transition(id)?)
    }

    /// Commit a transition on its own thread
    pub fn dispatch(&self, id: TransitionId) -> Result<CommitHandle> {
        Ok(self.coordinator.dispatch_transition(id)?)
    }

    /// Abort an initiated transition
    pub fn abort(&self, id: TransitionId) -> Result<()> {
        Ok(self.coordinator.abort_transition(id)?)
    }

    /// Status of a live or finished transition
    pub fn status(&self, id: TransitionId) -> Result<TransitionStatus> {
        Ok(self.coordinator.transition_status(id)?)
    }

    /// Finished transitions, newest first
    pub fn transition_history(&self, limit: usize) -> Vec<TransitionRecord> {
        self.coordinator.get_history(limit)
    }

    /// Begin, populate and commit a transition in one call
    ///
    /// If a change is rejected while populating, the transition is aborted
    /// and the rejection returned.
    pub fn transition(
        &self,
        source: &str,
        target: &str,
        changes: impl IntoIterator<Item = StateChange>,
    ) -> Result<u64> {
        let id = self.begin(source, target)?;
        for change in changes {
            if let Err(e) = self.coordinator.add_change(id, change) {
                debug!(transition = %id, error = %e, "aborting rejected transition");
                if let Err(abort) = self.coordinator.abort_transition(id) {
                    warn!(transition = %id, error = %abort, "abort after rejected change failed");
                }
                return Err(e.into());
            }
        }
        self.commit(id)
    }

    /// Get metrics
    pub fn metrics(&self) -> StatecraftMetrics {
        StatecraftMetrics {
            version: self.store.current_version().ok(),
            state_history: self.store.history_len(),
            rules: self.engine.rule_count(),
            validation: self.engine.metrics(),
            coordinator: self.coordinator.metrics(),
        }
    }
}

impl std::fmt::Debug for Statecraft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statecraft")
            .field("version", &self.store.current_version().ok())
            .field("rules", &self.engine.rule_count())
            .field("active", &self.coordinator.active_count())
            .finish()
    }
}

/// Snapshot of all component metrics
#[derive(Debug, Clone)]
pub struct StatecraftMetrics {
    /// Current state version (`None` before initialization)
    pub version: Option<u64>,
    /// Snapshots retained by the store
    pub state_history: usize,
    /// Registered validation rules
    pub rules: usize,
    /// Validation timings and cache hits
    pub validation: ValidationMetrics,
    /// Commit counters
    pub coordinator: CoordinatorMetrics,
}

/// Builder for configuring `Statecraft`
#[derive(Default)]
pub struct StatecraftBuilder {
    config: Config,
    initial_state: Option<SystemState>,
    executor: Option<Arc<dyn ChangeExecutor>>,
}

impl StatecraftBuilder {
    /// Create a builder with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every option with `config`
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Stop validation at the first failing rule
    pub fn strict(mut self) -> Self {
        self.config.validation.strict_mode = true;
        self
    }

    /// Report every failing rule
    pub fn lenient(mut self) -> Self {
        self.config.validation.strict_mode = false;
        self
    }

    /// Commit changes sequentially in dependency order
    pub fn atomic(mut self) -> Self {
        self.config.coordinator.atomic_mode = true;
        self
    }

    /// Commit changes on parallel workers
    pub fn concurrent(mut self) -> Self {
        self.config.coordinator.atomic_mode = false;
        self
    }

    /// Worker threads per concurrent commit
    pub fn max_workers(mut self, workers: usize) -> Self {
        self.config.coordinator.max_workers = Some(workers);
        self
    }

    /// Deadline for each commit
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.coordinator.timeout = Some(timeout);
        self
    }

    /// Maximum snapshots kept by the store
    pub fn max_state_history(mut self, n: usize) -> Self {
        self.config.store.max_state_history = n;
        self
    }

    /// Maximum concurrently open transitions
    pub fn max_transitions(mut self, n: usize) -> Self {
        self.config.coordinator.max_transitions = n;
        self
    }

    /// Apply changes with a custom executor
    pub fn executor(mut self, executor: Arc<dyn ChangeExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// State installed at version 0
    pub fn initial_state(mut self, state: SystemState) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Build the instance
    ///
    /// # Errors
    /// - `Config` when an option is out of range
    /// - `Validation` when the initial state fails validation
    pub fn build(self) -> Result<Statecraft> {
        let Config {
            validation,
            store,
            coordinator,
        } = self.config;
        if store.max_state_history == 0 {
            return Err(Error::Config("store.max_state_history must be > 0".into()));
        }
        if coordinator.max_transitions == 0 {
            return Err(Error::Config(
                "coordinator.max_transitions must be > 0".into(),
            ));
        }

        let strict = validation.strict_mode;
        let atomic = coordinator.atomic_mode;
        let engine = Arc::new(ValidationEngine::new(validation));
        let store = Arc::new(StateStore::new(Arc::clone(&engine), store));
        if let Some(state) = self.initial_state {
            store.initialize(state)?;
        }
        let coordinator = Arc::new(match self.executor {
            Some(executor) => TransitionCoordinator::with_executor(
                Arc::clone(&store),
                Arc::clone(&engine),
                coordinator,
                executor,
            ),
            None => {
                TransitionCoordinator::new(Arc::clone(&store), Arc::clone(&engine), coordinator)
            }
        });

        info!(strict, atomic, "statecraft ready");
        Ok(Statecraft {
            engine,
            store,
            coordinator,
        })
    }
}
