//! Core types for statecraft
//!
//! This crate defines the data model shared by the validation engine, the
//! state store and the transition coordinator:
//! - [`SystemState`], [`Component`], [`Resource`]: the versioned state
//! - [`StateChange`], [`ChangeType`]: units of work inside a transition
//! - [`Value`]: dynamic payload for changes and properties
//! - [`StateError`]: the error taxonomy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod change;
pub mod duration;
pub mod error;
pub mod state;
pub mod types;
pub mod value;

pub use change::{ChangeType, StateChange};
pub use error::{ErrorClass, Result, RuleFailure, StateError};
pub use state::{Component, ComponentStatus, Resource, SystemState};
pub use types::{now, ChangeId, SnapshotId, Timestamp, TransitionId};
pub use value::Value;
