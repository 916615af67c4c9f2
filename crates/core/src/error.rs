//! Error taxonomy shared by every statecraft crate
//!
//! Five error classes exist:
//!
//! | Class | Meaning | Recoverable |
//! |-------|---------|-------------|
//! | Validation | Malformed input or a failing rule | yes |
//! | Limit | A configured capacity was reached | yes, after backing off |
//! | NotFound | Missing transition, state, rule or snapshot | yes |
//! | Dependency | Unmet or cyclic dependency during commit | triggers rollback |
//! | Reversibility | Rollback hit a non-reversible change | **no** |
//!
//! Reversibility errors leave the system in an ambiguous state and require
//! external reconciliation. Nothing in this workspace retries internally;
//! retry/backoff is a caller-owned policy.

use crate::types::ChangeId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type for statecraft operations
pub type Result<T> = std::result::Result<T, StateError>;

/// A single failing validation rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleFailure {
    /// Rule identifier (intrinsic checks use a `builtin:` prefix)
    pub rule_id: String,
    /// Human-readable rule name
    pub rule_name: String,
    /// Error message produced by the rule
    pub message: String,
}

impl RuleFailure {
    /// Create a new rule failure
    pub fn new(
        rule_id: impl Into<String>,
        rule_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            rule_name: rule_name.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for RuleFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.rule_id, self.message)
    }
}

/// Coarse error class (see module docs)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Malformed input or failing rule
    Validation,
    /// Capacity exceeded
    Limit,
    /// Entity missing
    NotFound,
    /// Unmet dependency during execution
    Dependency,
    /// Rollback of a non-reversible change
    Reversibility,
}

/// All errors raised by the validation engine, state store and coordinator
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StateError {
    /// Malformed input or one or more failing validation rules
    #[error("validation failed: {message}")]
    Validation {
        /// Summary message
        message: String,
        /// Every failing rule (one entry in strict mode)
        failures: Vec<RuleFailure>,
    },

    /// A configured capacity was reached
    #[error("{resource} limit reached ({limit})")]
    Limit {
        /// What ran out (`rules`, `transitions`, ...)
        resource: &'static str,
        /// The configured limit
        limit: usize,
    },

    /// Entity not found
    #[error("not found: {entity}")]
    NotFound {
        /// Description of the missing entity
        entity: String,
    },

    /// A change could not run because a dependency had not completed
    #[error("dependency not satisfied for {change}: {message}")]
    Dependency {
        /// The change whose dependency was unmet
        change: ChangeId,
        /// What went wrong
        message: String,
    },

    /// The declared dependencies of a change set form a cycle
    #[error("dependency cycle between changes {changes:?}")]
    DependencyCycle {
        /// Changes participating in (or blocked behind) the cycle
        changes: Vec<ChangeId>,
    },

    /// Rollback reached a change that cannot be reversed
    #[error("change {change} on '{target}' is not reversible; state requires reconciliation")]
    Reversibility {
        /// The non-reversible change
        change: ChangeId,
        /// Target of the change
        target: String,
    },

    /// Compare-and-swap on the state store lost a race
    #[error("version conflict: expected {expected}, found {actual}")]
    Conflict {
        /// Version the caller based its proposal on
        expected: u64,
        /// Version actually current
        actual: u64,
    },

    /// Commit was cancelled or its deadline expired
    #[error("cancelled: {reason}")]
    Cancelled {
        /// Why the commit stopped
        reason: String,
    },

    /// Internal error (bug or invariant violation)
    #[error("internal error: {message}")]
    Internal {
        /// Error message
        message: String,
    },
}

impl StateError {
    /// Validation error without rule attribution
    pub fn validation(message: impl Into<String>) -> Self {
        StateError::Validation {
            message: message.into(),
            failures: Vec::new(),
        }
    }

    /// Validation error produced by rule evaluation
    pub fn rule_failures(failures: Vec<RuleFailure>) -> Self {
        let message = failures
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        StateError::Validation { message, failures }
    }

    /// Not-found error for the given entity description
    pub fn not_found(entity: impl Into<String>) -> Self {
        StateError::NotFound {
            entity: entity.into(),
        }
    }

    /// Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        StateError::Internal {
            message: message.into(),
        }
    }

    /// Map onto the five-class taxonomy
    pub fn class(&self) -> ErrorClass {
        match self {
            StateError::Validation { .. }
            | StateError::Conflict { .. }
            | StateError::Internal { .. } => ErrorClass::Validation,
            StateError::Limit { .. } => ErrorClass::Limit,
            StateError::NotFound { .. } => ErrorClass::NotFound,
            StateError::Dependency { .. }
            | StateError::DependencyCycle { .. }
            | StateError::Cancelled { .. } => ErrorClass::Dependency,
            StateError::Reversibility { .. } => ErrorClass::Reversibility,
        }
    }

    /// Failing rules carried by a validation error
    pub fn failures(&self) -> &[RuleFailure] {
        match self {
            StateError::Validation { failures, .. } => failures,
            _ => &[],
        }
    }

    /// Check if this error may succeed on retry with fresh state.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StateError::Limit { .. } | StateError::Conflict { .. } | StateError::Cancelled { .. }
        )
    }

    /// Check if this error leaves the system in an ambiguous state.
    pub fn is_fatal(&self) -> bool {
        matches!(self, StateError::Reversibility { .. })
    }
}
