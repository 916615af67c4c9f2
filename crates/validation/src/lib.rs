//! Rule-based validation for statecraft
//!
//! This crate implements the validation engine with:
//! - ValidationEngine: rule registry, priority ordering, strict/lenient modes
//! - Predicates over field paths (equality, numeric range, regex, closures)
//! - ValidationCache: TTL verdict cache keyed by content fingerprint
//! - MetricsWindow: rolling success-rate, latency and cache-hit figures

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod engine;
pub mod metrics;
pub mod options;
pub mod predicate;
pub mod rule;

pub use cache::{CacheEntry, CacheKey, ValidationCache};
pub use engine::ValidationEngine;
pub use metrics::{MetricPoint, MetricsWindow, ValidationMetrics};
pub use options::ValidationOptions;
pub use predicate::{EvalContext, FieldPath, Predicate};
pub use rule::{Condition, ConditionType, RuleKind, ValidationRule};
