//! Configuration file support.
//!
//! A [`Config`] bundles the options of all three components and can be
//! loaded from TOML. Every section and field is optional:
//!
//! ```toml
//! [validation]
//! strict_mode = false
//! cache_ttl_ms = 30000
//!
//! [store]
//! max_state_history = 50
//!
//! [coordinator]
//! atomic_mode = false
//! timeout_ms = 2000
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};
use statecraft_concurrency::CoordinatorOptions;
use statecraft_storage::StoreOptions;
use statecraft_validation::ValidationOptions;
use std::path::Path;

/// Options for every component
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Validation engine options
    pub validation: ValidationOptions,
    /// State store options
    pub store: StoreOptions,
    /// Transition coordinator options
    pub coordinator: CoordinatorOptions,
}

impl Config {
    /// Parse a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Read and parse a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
