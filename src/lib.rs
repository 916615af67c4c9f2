//! # Statecraft
//!
//! Transactional state coordination for systems made of components and
//! resources.
//!
//! Statecraft keeps a versioned [`SystemState`], guards every update with
//! validation rules and pluggable validators, and applies groups of
//! changes as transitions that either install completely or roll back.
//!
//! ## Quick Start
//!
//! ```ignore
//! use statecraft::prelude::*;
//!
//! let sc = Statecraft::new(
//!     SystemState::new("prod").with_component(Component::new("api", "service")),
//! )?;
//!
//! // Rules run on every update
//! sc.register_rule(ValidationRule::new(
//!     "api-healthy",
//!     "api health above 0.5",
//!     Condition::range("components.api.health", Some(0.5), None)?,
//! ))?;
//!
//! // Changes commit together or not at all
//! let id = sc.begin("inactive", "active")?;
//! sc.add_change(id, StateChange::status("api", "inactive", "active"))?;
//! let version = sc.commit(id)?;
//! ```
//!
//! ## Components
//!
//! - [`ValidationEngine`] - prioritized rules with a verdict cache
//! - [`StateStore`] - versioned state with bounded snapshot history
//! - [`TransitionCoordinator`] - dependency-ordered commits with rollback

#![warn(missing_docs)]

mod config;
mod error;
mod statecraft;

pub mod prelude;

// Re-export main entry points
pub use crate::statecraft::{Statecraft, StatecraftBuilder, StatecraftMetrics};
pub use config::Config;
pub use error::{Error, Result};

// Re-export core types
pub use statecraft_core::{
    now, ChangeId, ChangeType, Component, ComponentStatus, ErrorClass, Resource, RuleFailure,
    SnapshotId, StateChange, StateError, SystemState, Timestamp, TransitionId, Value,
};

// Re-export component types
pub use statecraft_concurrency::{
    CancellationToken, ChangeExecutor, CommitHandle, CoordinatorMetrics, CoordinatorOptions,
    DefaultExecutor, RollbackPlan, RollbackStep, StepStatus, Transition, TransitionCoordinator,
    TransitionRecord, TransitionStatus, TransitionType,
};
pub use statecraft_storage::{
    ResourceCapacityValidator, StateSnapshot, StateStore, StateTransitionLog, StoreOptions,
    Validator,
};
pub use statecraft_validation::{
    Condition, ConditionType, EvalContext, RuleKind, ValidationEngine, ValidationMetrics,
    ValidationOptions, ValidationRule,
};
