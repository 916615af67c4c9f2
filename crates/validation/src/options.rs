//! Validation engine options

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Validation engine options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationOptions {
    /// Stop at the first failing rule (`true`) or report every failure
    pub strict_mode: bool,
    /// Cache verdicts per state fingerprint
    pub cache_enabled: bool,
    /// How long a cached verdict stays live
    #[serde(rename = "cache_ttl_ms", with = "statecraft_core::duration::millis")]
    pub cache_ttl: Duration,
    /// Maximum cached verdicts
    pub max_cache_entries: usize,
    /// Maximum registered rules
    pub max_rules: usize,
    /// Size of the metrics ring
    pub max_metrics_history: usize,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        ValidationOptions {
            strict_mode: true,
            cache_enabled: true,
            cache_ttl: Duration::from_secs(60),
            max_cache_entries: 1024,
            max_rules: 100,
            max_metrics_history: 1000,
        }
    }
}

impl ValidationOptions {
    /// Fail fast on the first failing rule
    pub fn strict() -> Self {
        ValidationOptions {
            strict_mode: true,
            ..Default::default()
        }
    }

    /// Evaluate every rule and report all failures
    pub fn lenient() -> Self {
        ValidationOptions {
            strict_mode: false,
            ..Default::default()
        }
    }

    /// Never cache verdicts
    pub fn uncached() -> Self {
        ValidationOptions {
            cache_enabled: false,
            ..Default::default()
        }
    }
}
