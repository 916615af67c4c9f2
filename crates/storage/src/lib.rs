//! Storage layer for statecraft
//!
//! This crate implements the versioned state store with:
//! - StateStore: current state behind an RwLock, swapped atomically
//! - Bounded FIFO snapshot history and transition log
//! - Validator: pluggable acceptance checks run on every update
//! - ResourceCapacityValidator: `usage + allocated <= capacity`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod options;
pub mod snapshot;
pub mod store;
pub mod validator;

pub use options::StoreOptions;
pub use snapshot::{StateSnapshot, StateTransitionLog};
pub use store::StateStore;
pub use validator::{ResourceCapacityValidator, Validator};
