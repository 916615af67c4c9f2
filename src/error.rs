//! Unified error types for statecraft.
//!
//! This module flattens the component error taxonomy into a stable
//! facade error with the same retry/fatality helpers.

use statecraft_core::{RuleFailure, StateError};
use thiserror::Error;

/// All statecraft errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input or failing validation rules
    #[error("validation failed: {message}")]
    Validation {
        /// Summary message
        message: String,
        /// Every failing rule
        failures: Vec<RuleFailure>,
    },

    /// A configured capacity was reached
    #[error("limit reached: {0}")]
    Limit(String),

    /// Entity not found (state, transition, snapshot, ...)
    #[error("not found: {0}")]
    NotFound(String),

    /// Unsatisfiable ordering between changes
    #[error("dependency error: {0}")]
    Dependency(String),

    /// Rollback hit a change that cannot be reversed
    #[error("irreversible: {0}")]
    Reversibility(String),

    /// Version conflict on the state store
    #[error("conflict: {0}")]
    Conflict(String),

    /// Commit cancelled or timed out
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// Invalid configuration
    #[error("config error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error (bug or invariant violation)
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for statecraft operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is retryable.
    ///
    /// Retryable errors may succeed once the caller backs off or refreshes
    /// its view of the state.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Conflict(_) | Error::Limit(_) | Error::Cancelled(_)
        )
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Check if this is a conflict error.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }

    /// Check if this error leaves the state ambiguous and needs external
    /// reconciliation.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Reversibility(_))
    }

    /// Failing rules of a validation error
    pub fn failures(&self) -> &[RuleFailure] {
        match self {
            Error::Validation { failures, .. } => failures,
            _ => &[],
        }
    }
}

impl From<StateError> for Error {
    fn from(e: StateError) -> Self {
        match e {
            StateError::Validation { message, failures } => Error::Validation { message, failures },
            e @ StateError::Limit { .. } => Error::Limit(e.to_string()),
            StateError::NotFound { entity } => Error::NotFound(entity),
            e @ (StateError::Dependency { .. } | StateError::DependencyCycle { .. }) => {
                Error::Dependency(e.to_string())
            }
            e @ StateError::Reversibility { .. } => Error::Reversibility(e.to_string()),
            e @ StateError::Conflict { .. } => Error::Conflict(e.to_string()),
            StateError::Cancelled { reason } => Error::Cancelled(reason),
            StateError::Internal { message } => Error::Internal(message),
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}
