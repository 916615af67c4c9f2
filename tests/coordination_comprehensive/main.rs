//! Coordination Comprehensive Test Suite
//!
//! End-to-end tests of the validation engine, state store and transition
//! coordinator working together through the `Statecraft` facade.
//!
//! ## Key Verification Points
//!
//! 1. Committed transitions install exactly one new version
//! 2. Failed transitions leave the current state untouched
//! 3. Changes never run ahead of their dependencies
//! 4. History stays bounded and ordered
//!
//! ## Running Tests
//!
//! ```bash
//! # Run all coordination tests
//! cargo test --test coordination_comprehensive
//!
//! # Run atomicity tests only
//! cargo test --test coordination_comprehensive atomicity::
//! ```

use parking_lot::Mutex;
use statecraft::{
    ChangeExecutor, Component, DefaultExecutor, Resource, StateChange, StateError, Statecraft,
    SystemState,
};
use std::sync::Arc;

// Test modules
pub mod atomicity;
pub mod concurrency;
pub mod config;
pub mod dependencies;
pub mod history;
pub mod scenarios;
pub mod validation;

// =============================================================================
// SHARED TEST UTILITIES
// =============================================================================

/// Route engine logs to the test harness; safe to call from every test
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Two services, a database and one compute resource
pub fn base_state() -> SystemState {
    SystemState::new("prod")
        .with_component(Component::new("svc-1", "service"))
        .with_component(Component::new("svc-2", "service"))
        .with_component(Component::new("db", "database"))
        .with_resource(Resource::new("cpu", "compute", 8.0))
        .with_property("mode", "normal")
}

/// Default instance over [`base_state`]
pub fn statecraft() -> Statecraft {
    init_tracing();
    Statecraft::new(base_state()).expect("Failed to build statecraft")
}

/// Executor that records the target of every applied change, in order
#[derive(Default)]
pub struct RecordingExecutor {
    applied: Mutex<Vec<String>>,
}

impl RecordingExecutor {
    /// Create a shared recorder
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Targets applied so far
    pub fn applied(&self) -> Vec<String> {
        self.applied.lock().clone()
    }

    /// Position of `target` in the apply order
    pub fn position(&self, target: &str) -> Option<usize> {
        self.applied.lock().iter().position(|t| t == target)
    }
}

impl ChangeExecutor for RecordingExecutor {
    fn apply(&self, change: &StateChange, state: &mut SystemState) -> Result<(), StateError> {
        DefaultExecutor.apply(change, state)?;
        self.applied.lock().push(change.target.clone());
        Ok(())
    }

    fn revert(&self, change: &StateChange, state: &mut SystemState) -> Result<(), StateError> {
        DefaultExecutor.revert(change, state)
    }
}

/// `n` integer properties `k0..kn`, all zero
pub fn numbered_state(n: usize) -> SystemState {
    (0..n).fold(SystemState::new("numbered"), |state, i| {
        state.with_property(format!("k{}", i), 0)
    })
}
