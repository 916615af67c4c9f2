//! Validation engine
//!
//! Holds the rule registry, the verdict cache and the rolling metrics.
//! Each of the three is guarded by its own lock; no lock is held while
//! another is acquired.
//!
//! ## Evaluation
//!
//! ```text
//! 1. cache lookup (if enabled) ── live entry ──► cached verdict
//! 2. intrinsic checks (structure / status table)
//! 3. enabled rules of the matching kind, ascending priority
//!      strict:  stop at the first failure
//!      lenient: evaluate everything, aggregate failures
//! 4. store verdict in cache, record metric point
//! ```
//!
//! Evaluation failures are reported, never retried.

use crate::cache::{CacheKey, ValidationCache};
use crate::metrics::{MetricPoint, MetricsWindow, ValidationMetrics};
use crate::options::ValidationOptions;
use crate::predicate::EvalContext;
use crate::rule::{RuleKind, ValidationRule};
use parking_lot::{Mutex, RwLock};
use statecraft_core::{Result, RuleFailure, StateError, SystemState};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Rule registry + cache + metrics
pub struct ValidationEngine {
    options: ValidationOptions,
    /// Sorted by priority, registration order within a priority
    rules: RwLock<Vec<ValidationRule>>,
    cache: RwLock<ValidationCache>,
    metrics: Mutex<MetricsWindow>,
}

impl ValidationEngine {
    /// Create an engine with no rules
    pub fn new(options: ValidationOptions) -> Self {
        ValidationEngine {
            cache: RwLock::new(ValidationCache::new(
                options.cache_ttl,
                options.max_cache_entries,
            )),
            metrics: Mutex::new(MetricsWindow::new(options.max_metrics_history)),
            rules: RwLock::new(Vec::new()),
            options,
        }
    }

    /// Engine options
    pub fn options(&self) -> &ValidationOptions {
        &self.options
    }

    /// Register a rule
    ///
    /// # Errors
    /// - `Validation` for an empty ID, an empty condition expression or a
    ///   duplicate ID
    /// - `Limit` when `max_rules` rules are already registered
    ///
    /// Rules cannot be updated or removed once registered. Registering a
    /// rule invalidates every cached verdict.
    pub fn register_rule(&self, rule: ValidationRule) -> Result<()> {
        if rule.id.trim().is_empty() {
            return Err(StateError::validation("rule ID must not be empty"));
        }
        if rule.condition.expression.trim().is_empty() {
            return Err(StateError::validation(format!(
                "rule '{}' has an empty condition expression",
                rule.id
            )));
        }

        {
            let mut rules = self.rules.write();
            if rules.len() >= self.options.max_rules {
                warn!(
                    rule_id = %rule.id,
                    limit = self.options.max_rules,
                    "rule registry full"
                );
                return Err(StateError::Limit {
                    resource: "rules",
                    limit: self.options.max_rules,
                });
            }
            if rules.iter().any(|r| r.id == rule.id) {
                return Err(StateError::validation(format!(
                    "rule '{}' is already registered",
                    rule.id
                )));
            }

            info!(
                rule_id = %rule.id,
                kind = ?rule.kind,
                priority = rule.priority,
                "registered validation rule"
            );
            let pos = rules.partition_point(|r| r.priority <= rule.priority);
            rules.insert(pos, rule);
            // Cleared under the registry lock: no verdict computed against
            // the old rule set can be cached afterwards
            self.cache.write().clear();
        }

        Ok(())
    }

    /// Number of registered rules
    pub fn rule_count(&self) -> usize {
        self.rules.read().len()
    }

    /// Registered rules in evaluation order
    pub fn rules(&self) -> Vec<ValidationRule> {
        self.rules.read().clone()
    }

    /// Validate a single state
    ///
    /// Runs the structural checks (non-empty IDs, IDs matching their map
    /// keys, health in `[0, 1]`, finite non-negative resource figures) and
    /// then every enabled [`RuleKind::State`] rule.
    pub fn validate_state(&self, state: &SystemState) -> Result<()> {
        let key = self.cache_key(|| CacheKey::for_state(state));
        self.run(
            key,
            || structural_failures(state),
            RuleKind::State,
            EvalContext::for_state(state),
        )
    }

    /// Validate moving from `current` to `next`
    ///
    /// Runs the component status table (an absent component counts as
    /// `inactive`) and then every enabled [`RuleKind::Transition`] rule.
    pub fn validate_transition(&self, current: &SystemState, next: &SystemState) -> Result<()> {
        let key = self.cache_key(|| CacheKey::for_transition(current, next));
        self.run(
            key,
            || transition_failures(current, next),
            RuleKind::Transition,
            EvalContext::for_transition(current, next),
        )
    }

    /// Aggregates over the metrics window
    pub fn metrics(&self) -> ValidationMetrics {
        self.metrics.lock().summarize()
    }

    /// Drop every cached verdict
    pub fn clear_cache(&self) {
        self.cache.write().clear();
    }

    /// Number of cached verdicts
    pub fn cache_len(&self) -> usize {
        self.cache.read().len()
    }

    fn cache_key(&self, make: impl FnOnce() -> Option<CacheKey>) -> Option<CacheKey> {
        if self.options.cache_enabled {
            make()
        } else {
            None
        }
    }

    fn run(
        &self,
        key: Option<CacheKey>,
        intrinsic: impl FnOnce() -> Vec<RuleFailure>,
        kind: RuleKind,
        ctx: EvalContext<'_>,
    ) -> Result<()> {
        let start = Instant::now();

        if let Some(key) = &key {
            let cached = self
                .cache
                .read()
                .get(key, start)
                .map(|entry| entry.failures.clone());
            if let Some(failures) = cached {
                debug!(state_id = %key.state_id, "validation cache hit");
                return self.finish(start, Some(true), failures);
            }
        }

        let strict = self.options.strict_mode;
        let mut failures = Vec::new();
        let mut results = BTreeMap::new();
        // Held until the verdict is cached, see `register_rule`
        let rules = self.rules.read();

        for failure in intrinsic() {
            failures.push(failure);
            if strict {
                break;
            }
        }

        if !(strict && !failures.is_empty()) {
            for rule in rules.iter().filter(|r| r.enabled && r.kind == kind) {
                let (passed, message) = match rule.condition.evaluate(&ctx) {
                    Ok(true) => (true, None),
                    Ok(false) => (false, Some(rule.condition.error_msg.clone())),
                    Err(e) => {
                        warn!(rule_id = %rule.id, error = %e, "rule evaluation failed");
                        (false, Some(format!("evaluation error: {}", e)))
                    }
                };
                results.insert(rule.id.clone(), passed);
                if let Some(message) = message {
                    failures.push(RuleFailure::new(&rule.id, &rule.name, message));
                    if strict {
                        break;
                    }
                }
            }
        }

        if let Some(key) = key {
            self.cache
                .write()
                .insert(key, results, failures.clone(), Instant::now());
            drop(rules);
            self.finish(start, Some(false), failures)
        } else {
            self.finish(start, None, failures)
        }
    }

    fn finish(
        &self,
        start: Instant,
        cache_hit: Option<bool>,
        failures: Vec<RuleFailure>,
    ) -> Result<()> {
        let passed = failures.is_empty();
        self.metrics.lock().record(MetricPoint {
            passed,
            latency: start.elapsed(),
            cache_hit,
        });

        if passed {
            Ok(())
        } else {
            debug!(failures = failures.len(), "validation rejected state");
            Err(StateError::rule_failures(failures))
        }
    }
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::new(ValidationOptions::default())
    }
}

fn builtin(id: &str, name: &str, message: String) -> RuleFailure {
    RuleFailure::new(format!("builtin:{}", id), name, message)
}

fn structural_failures(state: &SystemState) -> Vec<RuleFailure> {
    let mut failures = Vec::new();

    if state.id.trim().is_empty() {
        failures.push(builtin("state_id", "state id", "state ID must not be empty".into()));
    }

    for (key, component) in &state.components {
        if component.id.is_empty() || component.id != *key {
            failures.push(builtin(
                "component_id",
                "component id",
                format!("component keyed '{}' has ID '{}'", key, component.id),
            ));
        }
        if !component.health.is_finite() || !(0.0..=1.0).contains(&component.health) {
            failures.push(builtin(
                "component_health",
                "component health",
                format!(
                    "component '{}' health {} outside [0, 1]",
                    key, component.health
                ),
            ));
        }
    }

    for (key, resource) in &state.resources {
        if resource.id.is_empty() || resource.id != *key {
            failures.push(builtin(
                "resource_id",
                "resource id",
                format!("resource keyed '{}' has ID '{}'", key, resource.id),
            ));
        }
        for (field, value) in [
            ("capacity", resource.capacity),
            ("usage", resource.usage),
            ("allocated", resource.allocated),
        ] {
            if !value.is_finite() || value < 0.0 {
                failures.push(builtin(
                    "resource_values",
                    "resource values",
                    format!("resource '{}' has invalid {} {}", key, field, value),
                ));
            }
        }
    }

    failures
}

fn transition_failures(current: &SystemState, next: &SystemState) -> Vec<RuleFailure> {
    let mut failures = Vec::new();

    if current.id != next.id {
        failures.push(builtin(
            "state_id",
            "state id",
            format!("state ID changed from '{}' to '{}'", current.id, next.id),
        ));
    }

    for (id, component) in &next.components {
        let from = current.status_of(id);
        if !from.can_transition_to(component.status) {
            failures.push(builtin(
                "status_transition",
                "status transition",
                format!(
                    "component '{}' cannot move from {} to {}",
                    id, from, component.status
                ),
            ));
        }
    }

    failures
}
