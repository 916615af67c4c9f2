//! State changes
//!
//! A [`StateChange`] is one step of a transition: it moves `target` from
//! `old_value` to `new_value`. Reversible changes are undone during
//! rollback by applying the change with old and new swapped.

use crate::error::{Result, StateError};
use crate::types::{now, ChangeId, Timestamp};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of change, which also determines how the default executor applies it
///
/// Type names are stable strings; the `component_*` and `resource_*`
/// families are recognized by prefix for dependency resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ChangeType {
    /// Component status change through the status table (`state`)
    State,
    /// Component status change (`component_status`)
    ComponentStatus,
    /// Component creation (`component_init`)
    ComponentInit,
    /// Component health change (`component_health`)
    ComponentHealth,
    /// Component property change (`component_property`)
    ComponentProperty,
    /// Resource allocation change (`resource_allocation`)
    ResourceAllocation,
    /// Resource usage change (`resource_usage`)
    ResourceUsage,
    /// System property change (`state_update`)
    StateUpdate,
    /// Anything else; needs a custom executor
    Custom(String),
}

impl ChangeType {
    /// Stable type name
    pub fn as_str(&self) -> &str {
        match self {
            ChangeType::State => "state",
            ChangeType::ComponentStatus => "component_status",
            ChangeType::ComponentInit => "component_init",
            ChangeType::ComponentHealth => "component_health",
            ChangeType::ComponentProperty => "component_property",
            ChangeType::ResourceAllocation => "resource_allocation",
            ChangeType::ResourceUsage => "resource_usage",
            ChangeType::StateUpdate => "state_update",
            ChangeType::Custom(name) => name,
        }
    }

    /// Member of the `component_*` family
    pub fn is_component(&self) -> bool {
        self.as_str().starts_with("component_")
    }

    /// Member of the `resource_*` family
    pub fn is_resource(&self) -> bool {
        self.as_str().starts_with("resource_")
    }
}

impl FromStr for ChangeType {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "" => return Err(StateError::validation("change type must not be empty")),
            "state" => ChangeType::State,
            "component_status" => ChangeType::ComponentStatus,
            "component_init" => ChangeType::ComponentInit,
            "component_health" => ChangeType::ComponentHealth,
            "component_property" => ChangeType::ComponentProperty,
            "resource_allocation" => ChangeType::ResourceAllocation,
            "resource_usage" => ChangeType::ResourceUsage,
            "state_update" => ChangeType::StateUpdate,
            other => ChangeType::Custom(other.to_string()),
        })
    }
}

impl TryFrom<String> for ChangeType {
    type Error = StateError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<ChangeType> for String {
    fn from(t: ChangeType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One change within a transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChange {
    /// Kind of change
    pub change_type: ChangeType,
    /// What is changed (component ID, resource ID, property key, ...)
    pub target: String,
    /// Expected value before the change
    pub old_value: Value,
    /// Value after the change
    pub new_value: Value,
    /// When the change was created
    pub timestamp: Timestamp,
    /// Whether rollback may undo this change
    pub reversible: bool,
    /// Changes of the same transition that must complete first
    pub depends_on: Vec<ChangeId>,
}

impl StateChange {
    /// Create a reversible change stamped with the current time
    pub fn new(
        change_type: ChangeType,
        target: impl Into<String>,
        old_value: impl Into<Value>,
        new_value: impl Into<Value>,
    ) -> Self {
        Self {
            change_type,
            target: target.into(),
            old_value: old_value.into(),
            new_value: new_value.into(),
            timestamp: now(),
            reversible: true,
            depends_on: Vec::new(),
        }
    }

    /// Shorthand for a `state` change of a component status
    pub fn status(
        target: impl Into<String>,
        from: impl Into<Value>,
        to: impl Into<Value>,
    ) -> Self {
        Self::new(ChangeType::State, target, from, to)
    }

    /// Mark the change as not reversible
    pub fn irreversible(mut self) -> Self {
        self.reversible = false;
        self
    }

    /// Declare that this change must run after `change`
    pub fn depends_on(mut self, change: ChangeId) -> Self {
        if !self.depends_on.contains(&change) {
            self.depends_on.push(change);
        }
        self
    }

    /// The same change with old and new values swapped
    pub fn inverted(&self) -> Self {
        Self {
            old_value: self.new_value.clone(),
            new_value: self.old_value.clone(),
            timestamp: now(),
            ..self.clone()
        }
    }

    /// Check the change is well formed
    ///
    /// Requires a non-empty type and target, non-null old and new values,
    /// and a timestamp after the Unix epoch.
    pub fn validate(&self) -> Result<()> {
        if self.change_type.as_str().is_empty() {
            return Err(StateError::validation("change type must not be empty"));
        }
        if self.target.trim().is_empty() {
            return Err(StateError::validation("change target must not be empty"));
        }
        if self.old_value.is_null() {
            return Err(StateError::validation(format!(
                "change on '{}' has no old value",
                self.target
            )));
        }
        if self.new_value.is_null() {
            return Err(StateError::validation(format!(
                "change on '{}' has no new value",
                self.target
            )));
        }
        if self.timestamp.timestamp_millis() <= 0 {
            return Err(StateError::validation(format!(
                "change on '{}' has no timestamp",
                self.target
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_change_type_roundtrip_names() {
        for name in [
            "state",
            "component_status",
            "component_init",
            "component_health",
            "component_property",
            "resource_allocation",
            "resource_usage",
            "state_update",
            "external_hook",
        ] {
            let t: ChangeType = name.parse().unwrap();
            assert_eq!(t.as_str(), name);
        }
        assert!("".parse::<ChangeType>().is_err());
    }

    #[test]
    fn test_change_type_families() {
        assert!(ChangeType::ComponentInit.is_component());
        assert!(ChangeType::ResourceUsage.is_resource());
        assert!(!ChangeType::State.is_component());
        assert!(ChangeType::Custom("resource_lease".into()).is_resource());
    }

    #[test]
    fn test_change_type_serde_as_string() {
        let json = serde_json::to_string(&ChangeType::ResourceAllocation).unwrap();
        assert_eq!(json, "\"resource_allocation\"");
        let back: ChangeType = serde_json::from_str("\"custom_kind\"").unwrap();
        assert_eq!(back, ChangeType::Custom("custom_kind".into()));
    }

    #[test]
    fn test_validate_rejects_malformed() {
        assert!(StateChange::status("svc", "inactive", "active").validate().is_ok());
        assert!(StateChange::status("", "inactive", "active").validate().is_err());
        assert!(StateChange::status("svc", Value::Null, "active").validate().is_err());
        assert!(StateChange::status("svc", "inactive", Value::Null).validate().is_err());

        let mut epoch = StateChange::status("svc", "inactive", "active");
        epoch.timestamp = Utc.timestamp_opt(0, 0).unwrap();
        assert!(epoch.validate().is_err());
    }

    #[test]
    fn test_inverted_swaps_values() {
        let change = StateChange::status("svc", "inactive", "active").irreversible();
        let inv = change.inverted();
        assert_eq!(inv.old_value, Value::from("active"));
        assert_eq!(inv.new_value, Value::from("inactive"));
        assert!(!inv.reversible);
    }

    #[test]
    fn test_depends_on_dedups() {
        let change = StateChange::status("svc", "inactive", "active")
            .depends_on(ChangeId(0))
            .depends_on(ChangeId(0));
        assert_eq!(change.depends_on, vec![ChangeId(0)]);
    }
}
