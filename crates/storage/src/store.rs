//! Versioned state store
//!
//! Owns the current [`SystemState`] and its bounded history. All mutation
//! goes through [`StateStore::update_state`] (or its compare-and-swap
//! variant), which runs under the store's exclusive lock:
//!
//! ```text
//! 1. engine.validate_state(proposed)
//! 2. engine.validate_transition(current, proposed)
//! 3. registered validators, in name order
//! 4. snapshot current into history (FIFO eviction)
//! 5. proposed.version = current.version + 1, proposed.timestamp = now
//! 6. swap the current pointer, append to the transition log
//! ```
//!
//! Readers never observe a partially applied update: they either see the
//! old `Arc<SystemState>` or the new one.
//!
//! # Thread Safety
//!
//! Validators run while the exclusive lock is held and must not call back
//! into the store.

use crate::options::StoreOptions;
use crate::snapshot::{StateSnapshot, StateTransitionLog};
use crate::validator::{ResourceCapacityValidator, Validator};
use parking_lot::RwLock;
use statecraft_core::{now, Result, SnapshotId, StateError, SystemState};
use statecraft_validation::ValidationEngine;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, warn};

struct Current {
    state: Arc<SystemState>,
    snapshot_id: SnapshotId,
}

#[derive(Default)]
struct Inner {
    current: Option<Current>,
    history: VecDeque<StateSnapshot>,
    log: VecDeque<StateTransitionLog>,
}

/// Versioned store for the system state
pub struct StateStore {
    engine: Arc<ValidationEngine>,
    options: StoreOptions,
    inner: RwLock<Inner>,
    validators: RwLock<BTreeMap<String, Arc<dyn Validator>>>,
}

impl StateStore {
    /// Create an uninitialized store
    ///
    /// The built-in [`ResourceCapacityValidator`] is registered under
    /// `"resource_capacity"`.
    pub fn new(engine: Arc<ValidationEngine>, options: StoreOptions) -> Self {
        let mut validators: BTreeMap<String, Arc<dyn Validator>> = BTreeMap::new();
        validators.insert(
            ResourceCapacityValidator::NAME.to_string(),
            Arc::new(ResourceCapacityValidator),
        );
        StateStore {
            engine,
            options,
            inner: RwLock::new(Inner::default()),
            validators: RwLock::new(validators),
        }
    }

    /// Create a store and initialize it with `state`
    pub fn with_state(
        engine: Arc<ValidationEngine>,
        options: StoreOptions,
        state: SystemState,
    ) -> Result<Self> {
        let store = Self::new(engine, options);
        store.initialize(state)?;
        Ok(store)
    }

    /// Store options
    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Install the first state at version 0
    ///
    /// # Errors
    /// - `Validation` if the store is already initialized, or the state
    ///   fails the engine's state checks or a registered validator
    pub fn initialize(&self, mut state: SystemState) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.current.is_some() {
            return Err(StateError::validation("state store is already initialized"));
        }

        state.version = 0;
        state.timestamp = now();
        self.engine.validate_state(&state)?;
        self.run_validators(&state, &state)?;

        info!(state_id = %state.id, "state store initialized");
        inner.current = Some(Current {
            state: Arc::new(state),
            snapshot_id: SnapshotId::new(),
        });
        Ok(())
    }

    /// Current state
    ///
    /// # Errors
    /// - `NotFound` before [`initialize`](Self::initialize)
    pub fn get_current_state(&self) -> Result<Arc<SystemState>> {
        self.inner
            .read()
            .current
            .as_ref()
            .map(|c| Arc::clone(&c.state))
            .ok_or_else(|| StateError::not_found("current state"))
    }

    /// Version of the current state
    pub fn current_version(&self) -> Result<u64> {
        self.get_current_state().map(|s| s.version)
    }

    /// Validate and install `proposed` as the next version
    ///
    /// The caller's `version` and `timestamp` are overwritten. Returns the
    /// new version.
    pub fn update_state(&self, proposed: SystemState) -> Result<u64> {
        self.apply(None, proposed)
    }

    /// Like [`update_state`](Self::update_state), but only if the current
    /// version is still `expected_version`
    ///
    /// # Errors
    /// - `Conflict` if another update landed first
    pub fn update_state_if(&self, expected_version: u64, proposed: SystemState) -> Result<u64> {
        self.apply(Some(expected_version), proposed)
    }

    fn apply(&self, expected_version: Option<u64>, mut proposed: SystemState) -> Result<u64> {
        let mut inner = self.inner.write();
        let current = match &inner.current {
            Some(c) => Arc::clone(&c.state),
            None => return Err(StateError::not_found("current state")),
        };

        if let Some(expected) = expected_version {
            if current.version != expected {
                warn!(
                    expected,
                    actual = current.version,
                    "state update lost version race"
                );
                return Err(StateError::Conflict {
                    expected,
                    actual: current.version,
                });
            }
        }

        if let Err(e) = self
            .engine
            .validate_state(&proposed)
            .and_then(|_| self.engine.validate_transition(&current, &proposed))
            .and_then(|_| self.run_validators(&current, &proposed))
        {
            debug!(state_id = %proposed.id, error = %e, "state update rejected");
            return Err(e);
        }

        let from_version = current.version;
        let to_version = from_version + 1;
        proposed.version = to_version;
        proposed.timestamp = now();

        let to_snapshot = SnapshotId::new();
        let (from_snapshot, old_state) = match inner.current.take() {
            Some(c) => (c.snapshot_id, c.state),
            None => return Err(StateError::internal("current state vanished under lock")),
        };

        let taken_at = proposed.timestamp;
        inner.history.push_back(StateSnapshot {
            id: from_snapshot,
            state: old_state,
            taken_at,
        });
        while inner.history.len() > self.options.max_state_history {
            inner.history.pop_front();
        }

        inner.current = Some(Current {
            state: Arc::new(proposed),
            snapshot_id: to_snapshot,
        });

        inner.log.push_back(StateTransitionLog {
            from_snapshot,
            to_snapshot,
            from_version,
            to_version,
            timestamp: taken_at,
        });
        while inner.log.len() > self.options.max_transition_log {
            inner.log.pop_front();
        }

        debug!(from_version, to_version, "state updated");
        Ok(to_version)
    }

    fn run_validators(&self, current: &SystemState, proposed: &SystemState) -> Result<()> {
        for (name, validator) in self.validators.read().iter() {
            if let Err(e) = validator.validate(current, proposed) {
                debug!(validator = %name, error = %e, "validator rejected state");
                return Err(e);
            }
        }
        Ok(())
    }

    /// Register a validator under `name`, replacing any previous one
    pub fn register_validator(&self, name: impl Into<String>, validator: impl Validator + 'static) {
        let name = name.into();
        info!(validator = %name, "registered state validator");
        self.validators.write().insert(name, Arc::new(validator));
    }

    /// Names of the registered validators, in execution order
    pub fn validator_names(&self) -> Vec<String> {
        self.validators.read().keys().cloned().collect()
    }

    /// Up to `limit` snapshots, newest first
    pub fn get_history(&self, limit: usize) -> Vec<StateSnapshot> {
        self.inner
            .read()
            .history
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    /// Retained snapshot of `version`
    ///
    /// # Errors
    /// - `NotFound` if the version is current, evicted or never existed
    pub fn get_snapshot(&self, version: u64) -> Result<StateSnapshot> {
        self.inner
            .read()
            .history
            .iter()
            .find(|s| s.version() == version)
            .cloned()
            .ok_or_else(|| StateError::not_found(format!("snapshot of version {}", version)))
    }

    /// Number of retained snapshots
    pub fn history_len(&self) -> usize {
        self.inner.read().history.len()
    }

    /// Up to `limit` transition log entries, newest first
    pub fn transition_log(&self, limit: usize) -> Vec<StateTransitionLog> {
        self.inner
            .read()
            .log
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("StateStore")
            .field("version", &inner.current.as_ref().map(|c| c.state.version))
            .field("history_len", &inner.history.len())
            .field("validators", &self.validators.read().len())
            .finish()
    }
}
