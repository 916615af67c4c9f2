//! Change execution
//!
//! The coordinator applies changes to a private working copy of the
//! current state through a [`ChangeExecutor`]; the copy is only installed
//! in the store once every change has applied.
//!
//! Rollback calls [`ChangeExecutor::revert`], which by default applies the
//! change with old and new values swapped. Executors whose changes have
//! effects outside the working state (allocating real resources, calling
//! other services) override `revert` with the matching inverse action.

use statecraft_core::{
    now, ChangeType, Component, ComponentStatus, Resource, Result, StateChange, StateError,
    SystemState, Value,
};

/// Applies and reverts changes against a working state
pub trait ChangeExecutor: Send + Sync {
    /// Apply `change` to `state`
    fn apply(&self, change: &StateChange, state: &mut SystemState) -> Result<()>;

    /// Undo a previously applied `change`
    fn revert(&self, change: &StateChange, state: &mut SystemState) -> Result<()> {
        self.apply(&change.inverted(), state)
    }
}

/// Interprets the built-in change types
///
/// | type | target | effect |
/// |------|--------|--------|
/// | `state`, `component_status` | component ID | set status (component created `inactive` if absent) |
/// | `component_init` | component ID | insert component, `new_value` is its type |
/// | `component_health` | component ID | set health |
/// | `component_property` | `<component>.<key>` | set component property |
/// | `resource_allocation` | resource ID | set `allocated` |
/// | `resource_usage` | resource ID | set `usage` |
/// | `state_update` | property key | set system property |
///
/// Every type checks `old_value` against the working state and rejects a
/// stale change. Custom types are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultExecutor;

impl ChangeExecutor for DefaultExecutor {
    fn apply(&self, change: &StateChange, state: &mut SystemState) -> Result<()> {
        match &change.change_type {
            ChangeType::State | ChangeType::ComponentStatus => set_status(change, state, true),
            ChangeType::ComponentInit => init_component(change, state),
            ChangeType::ComponentHealth => {
                let component = component_mut(state, &change.target)?;
                check_number(change, component.health)?;
                component.health = number(change)?;
                component.last_update = now();
                Ok(())
            }
            ChangeType::ComponentProperty => {
                let (id, key) = change.target.split_once('.').ok_or_else(|| {
                    StateError::validation(format!(
                        "component property target '{}' is not '<component>.<key>'",
                        change.target
                    ))
                })?;
                let component = component_mut(state, id)?;
                check_value(change, component.properties.get(key))?;
                component
                    .properties
                    .insert(key.to_string(), change.new_value.clone());
                component.last_update = now();
                Ok(())
            }
            ChangeType::ResourceAllocation => {
                let resource = resource_mut(state, &change.target)?;
                check_number(change, resource.allocated)?;
                resource.allocated = number(change)?;
                Ok(())
            }
            ChangeType::ResourceUsage => {
                let resource = resource_mut(state, &change.target)?;
                check_number(change, resource.usage)?;
                resource.usage = number(change)?;
                Ok(())
            }
            ChangeType::StateUpdate => {
                check_value(change, state.properties.get(&change.target))?;
                state
                    .properties
                    .insert(change.target.clone(), change.new_value.clone());
                Ok(())
            }
            ChangeType::Custom(name) => Err(StateError::validation(format!(
                "no executor for change type '{}'",
                name
            ))),
        }
    }

    fn revert(&self, change: &StateChange, state: &mut SystemState) -> Result<()> {
        match change.change_type {
            // Undo restores the previous status even where the reverse
            // pair is not in the status table (e.g. active -> error)
            ChangeType::State | ChangeType::ComponentStatus => {
                set_status(&change.inverted(), state, false)
            }
            ChangeType::ComponentInit => state
                .components
                .remove(&change.target)
                .map(|_| ())
                .ok_or_else(|| StateError::not_found(format!("component '{}'", change.target))),
            _ => self.apply(&change.inverted(), state),
        }
    }
}

fn set_status(change: &StateChange, state: &mut SystemState, enforce_table: bool) -> Result<()> {
    let from = ComponentStatus::from_value(&change.old_value)?;
    let to = ComponentStatus::from_value(&change.new_value)?;
    if enforce_table && !from.can_transition_to(to) {
        return Err(StateError::validation(format!(
            "component '{}' cannot move from {} to {}",
            change.target, from, to
        )));
    }

    let component = state
        .components
        .entry(change.target.clone())
        .or_insert_with(|| Component::new(change.target.clone(), "component"));
    if component.status != from {
        return Err(stale(change, &Value::from(component.status)));
    }
    component.status = to;
    component.last_update = now();
    Ok(())
}

fn init_component(change: &StateChange, state: &mut SystemState) -> Result<()> {
    if state.components.contains_key(&change.target) {
        return Err(StateError::validation(format!(
            "component '{}' already exists",
            change.target
        )));
    }
    let component_type = change.new_value.as_str().ok_or_else(|| {
        StateError::validation(format!(
            "component_init for '{}' needs a string type, got {}",
            change.target,
            change.new_value.type_name()
        ))
    })?;
    state.components.insert(
        change.target.clone(),
        Component::new(change.target.clone(), component_type),
    );
    Ok(())
}

fn component_mut<'a>(state: &'a mut SystemState, id: &str) -> Result<&'a mut Component> {
    state
        .components
        .get_mut(id)
        .ok_or_else(|| StateError::not_found(format!("component '{}'", id)))
}

fn resource_mut<'a>(state: &'a mut SystemState, id: &str) -> Result<&'a mut Resource> {
    state
        .resources
        .get_mut(id)
        .ok_or_else(|| StateError::not_found(format!("resource '{}'", id)))
}

fn number(change: &StateChange) -> Result<f64> {
    change.new_value.as_number().ok_or_else(|| {
        StateError::validation(format!(
            "{} on '{}' needs a number, got {}",
            change.change_type,
            change.target,
            change.new_value.type_name()
        ))
    })
}

fn check_number(change: &StateChange, actual: f64) -> Result<()> {
    match change.old_value.as_number() {
        Some(expected) if (expected - actual).abs() <= f64::EPSILON => Ok(()),
        _ => Err(stale(change, &Value::Float(actual))),
    }
}

fn check_value(change: &StateChange, actual: Option<&Value>) -> Result<()> {
    match actual {
        Some(actual) if *actual != change.old_value => Err(stale(change, actual)),
        _ => Ok(()),
    }
}

fn stale(change: &StateChange, actual: &Value) -> StateError {
    StateError::validation(format!(
        "stale {} on '{}': expected {}, found {}",
        change.change_type, change.target, change.old_value, actual
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use statecraft_core::ErrorClass;

    fn state() -> SystemState {
        SystemState::new("sys")
            .with_component(Component::new("svc-1", "service"))
            .with_resource(Resource::new("cpu", "compute", 4.0))
            .with_property("mode", "normal")
    }

    #[test]
    fn test_status_change_and_revert() {
        let mut s = state();
        let change = StateChange::status("svc-1", "inactive", "active");
        DefaultExecutor.apply(&change, &mut s).unwrap();
        assert_eq!(s.status_of("svc-1"), ComponentStatus::Active);

        DefaultExecutor.revert(&change, &mut s).unwrap();
        assert_eq!(s.status_of("svc-1"), ComponentStatus::Inactive);
    }

    #[test]
    fn test_failure_status_reverts_outside_table() {
        let mut s = state();
        DefaultExecutor
            .apply(&StateChange::status("svc-1", "inactive", "active"), &mut s)
            .unwrap();
        let fail = StateChange::status("svc-1", "active", "error");
        DefaultExecutor.apply(&fail, &mut s).unwrap();

        DefaultExecutor.revert(&fail, &mut s).unwrap();
        assert_eq!(s.status_of("svc-1"), ComponentStatus::Active);
    }

    #[test]
    fn test_status_change_creates_missing_component() {
        let mut s = state();
        DefaultExecutor
            .apply(&StateChange::status("svc-9", "inactive", "active"), &mut s)
            .unwrap();
        assert_eq!(s.status_of("svc-9"), ComponentStatus::Active);
    }

    #[test]
    fn test_status_outside_table_is_rejected() {
        let mut s = state();
        let err = DefaultExecutor
            .apply(&StateChange::status("svc-1", "active", "broken"), &mut s)
            .unwrap_err();
        assert_eq!(err.class(), ErrorClass::Validation);

        let err = DefaultExecutor
            .apply(&StateChange::status("svc-1", "inactive", "error"), &mut s)
            .unwrap_err();
        assert!(err.to_string().contains("cannot move"));
    }

    #[test]
    fn test_stale_old_value() {
        let mut s = state();
        let err = DefaultExecutor
            .apply(&StateChange::status("svc-1", "active", "inactive"), &mut s)
            .unwrap_err();
        assert!(err.to_string().contains("stale"));

        let err = DefaultExecutor
            .apply(
                &StateChange::new(ChangeType::StateUpdate, "mode", "degraded", "off"),
                &mut s,
            )
            .unwrap_err();
        assert!(err.to_string().contains("stale"));
    }

    #[test]
    fn test_numeric_changes() {
        let mut s = state();
        DefaultExecutor
            .apply(&StateChange::new(ChangeType::ResourceUsage, "cpu", 0.0, 2.5), &mut s)
            .unwrap();
        DefaultExecutor
            .apply(&StateChange::new(ChangeType::ResourceAllocation, "cpu", 0, 1), &mut s)
            .unwrap();
        DefaultExecutor
            .apply(&StateChange::new(ChangeType::ComponentHealth, "svc-1", 1.0, 0.4), &mut s)
            .unwrap();

        assert_eq!(s.resource("cpu").unwrap().usage, 2.5);
        assert_eq!(s.resource("cpu").unwrap().allocated, 1.0);
        assert_eq!(s.component("svc-1").unwrap().health, 0.4);

        let err = DefaultExecutor
            .apply(&StateChange::new(ChangeType::ResourceUsage, "disk", 0, 1), &mut s)
            .unwrap_err();
        assert_eq!(err.class(), ErrorClass::NotFound);
    }

    #[test]
    fn test_component_property() {
        let mut s = state();
        let change = StateChange::new(ChangeType::ComponentProperty, "svc-1.replicas", 0, 3);
        DefaultExecutor.apply(&change, &mut s).unwrap();
        assert_eq!(
            s.component("svc-1").unwrap().properties.get("replicas"),
            Some(&Value::Int(3))
        );

        let bad = StateChange::new(ChangeType::ComponentProperty, "svc-1", 0, 3);
        assert!(DefaultExecutor.apply(&bad, &mut s).is_err());
    }

    #[test]
    fn test_init_reverts_by_removal() {
        let mut s = state();
        let init = StateChange::new(ChangeType::ComponentInit, "cache", "none", "redis");
        DefaultExecutor.apply(&init, &mut s).unwrap();
        assert_eq!(s.component("cache").unwrap().component_type, "redis");
        assert!(DefaultExecutor.apply(&init, &mut s).is_err());

        DefaultExecutor.revert(&init, &mut s).unwrap();
        assert!(s.component("cache").is_none());
    }

    #[test]
    fn test_custom_type_is_rejected() {
        let mut s = state();
        let change = StateChange::new(ChangeType::Custom("webhook".into()), "hook", 0, 1);
        assert!(DefaultExecutor.apply(&change, &mut s).is_err());
    }
}
