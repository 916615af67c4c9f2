//! Pluggable acceptance checks
//!
//! Validators run after the validation engine, in name order, on every
//! `update_state`. They see both the current and the proposed state.

use statecraft_core::{Result, RuleFailure, StateError, SystemState};

/// Acceptance check over a proposed update
pub trait Validator: Send + Sync {
    /// Accept or reject moving from `current` to `proposed`
    fn validate(&self, current: &SystemState, proposed: &SystemState) -> Result<()>;
}

impl<F> Validator for F
where
    F: Fn(&SystemState, &SystemState) -> Result<()> + Send + Sync,
{
    fn validate(&self, current: &SystemState, proposed: &SystemState) -> Result<()> {
        self(current, proposed)
    }
}

/// Rejects any resource whose `usage + allocated` exceeds its capacity
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceCapacityValidator;

impl ResourceCapacityValidator {
    /// Name the store registers this validator under
    pub const NAME: &'static str = "resource_capacity";
}

impl Validator for ResourceCapacityValidator {
    fn validate(&self, _current: &SystemState, proposed: &SystemState) -> Result<()> {
        let failures: Vec<_> = proposed
            .resources
            .values()
            .filter(|r| !r.within_capacity())
            .map(|r| {
                RuleFailure::new(
                    format!("validator:{}", Self::NAME),
                    "resource capacity",
                    format!(
                        "resource '{}' over capacity: usage {} + allocated {} > {}",
                        r.id, r.usage, r.allocated, r.capacity
                    ),
                )
            })
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(StateError::rule_failures(failures))
        }
    }
}
