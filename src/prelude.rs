//! Convenient imports for statecraft.
//!
//! ```ignore
//! use statecraft::prelude::*;
//!
//! let sc = Statecraft::new(SystemState::new("prod"))?;
//! ```

// Main entry point
pub use crate::statecraft::{Statecraft, StatecraftBuilder};

// Error handling
pub use crate::error::{Error, Result};

// Configuration
pub use crate::config::Config;

// State model
pub use statecraft_core::{
    ChangeType, Component, ComponentStatus, Resource, StateChange, SystemState, Value,
};

// Rules
pub use statecraft_validation::{Condition, RuleKind, ValidationRule};

// Transitions
pub use statecraft_concurrency::{TransitionRecord, TransitionStatus};
