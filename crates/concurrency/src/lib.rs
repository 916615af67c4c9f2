//! Concurrency layer for statecraft
//!
//! This crate implements the transition coordinator with:
//! - TransitionCoordinator: begin / add change / commit / abort lifecycle
//! - DependencyResolver + DependencyGraph: implicit and declared ordering,
//!   cycle detection before execution
//! - Atomic (ordered, single-threaded) and concurrent (dependency-gated
//!   worker threads) execution
//! - RollbackPlan: reverse-order undo on any failure
//! - CancellationToken: caller cancellation and commit deadlines

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cancel;
pub mod coordinator;
pub mod dependency;
pub mod executor;
pub mod options;
pub mod pending;
pub mod rollback;
pub mod transition;

pub use cancel::CancellationToken;
pub use coordinator::{CommitHandle, CoordinatorMetrics, TransitionCoordinator};
pub use dependency::{DependencyGraph, DependencyResolver};
pub use executor::{ChangeExecutor, DefaultExecutor};
pub use options::CoordinatorOptions;
pub use pending::{ChangePriority, PendingChange, PendingStatus};
pub use rollback::{RollbackPlan, RollbackStep, StepStatus};
pub use transition::{Transition, TransitionRecord, TransitionStatus, TransitionType};
