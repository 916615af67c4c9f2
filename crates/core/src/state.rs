//! System state model
//!
//! A [`SystemState`] is a versioned snapshot of process-wide components,
//! resources and properties. The state store hands out states behind an
//! `Arc`; a state that has been superseded is never mutated again.

use crate::error::{Result, StateError};
use crate::types::{now, Timestamp};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a component
///
/// Allowed status transitions:
///
/// ```text
/// inactive ──► active ──► inactive
///                 │
///                 └─────► error ──► inactive
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    /// Not running
    #[default]
    Inactive,
    /// Running
    Active,
    /// Failed
    Error,
}

impl ComponentStatus {
    /// Stable lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentStatus::Inactive => "inactive",
            ComponentStatus::Active => "active",
            ComponentStatus::Error => "error",
        }
    }

    /// Whether moving from `self` to `next` is allowed by the status table
    ///
    /// Staying in the same status is not a transition and is always allowed.
    pub fn can_transition_to(&self, next: ComponentStatus) -> bool {
        use ComponentStatus::*;
        *self == next
            || matches!(
                (*self, next),
                (Inactive, Active) | (Active, Inactive) | (Active, Error) | (Error, Inactive)
            )
    }

    /// Parse a status carried in a [`Value::String`]
    pub fn from_value(value: &Value) -> Result<Self> {
        match value.as_str() {
            Some(s) => s.parse(),
            None => Err(StateError::validation(format!(
                "component status must be a string, got {}",
                value.type_name()
            ))),
        }
    }
}

impl FromStr for ComponentStatus {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "inactive" => Ok(ComponentStatus::Inactive),
            "active" => Ok(ComponentStatus::Active),
            "error" => Ok(ComponentStatus::Error),
            other => Err(StateError::validation(format!(
                "unknown component status '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ComponentStatus> for Value {
    fn from(status: ComponentStatus) -> Self {
        Value::String(status.as_str().to_string())
    }
}

/// A managed component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// Component identifier (matches its key in [`SystemState::components`])
    pub id: String,
    /// Free-form component type
    pub component_type: String,
    /// Lifecycle status
    pub status: ComponentStatus,
    /// Health in `[0, 1]`
    pub health: f64,
    /// Arbitrary properties
    pub properties: BTreeMap<String, Value>,
    /// Last time this component was modified
    pub last_update: Timestamp,
}

impl Component {
    /// Create an inactive, fully healthy component
    pub fn new(id: impl Into<String>, component_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            component_type: component_type.into(),
            status: ComponentStatus::Inactive,
            health: 1.0,
            properties: BTreeMap::new(),
            last_update: now(),
        }
    }

    /// Set the initial status
    pub fn with_status(mut self, status: ComponentStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the initial health
    pub fn with_health(mut self, health: f64) -> Self {
        self.health = health;
        self
    }

    /// Add a property
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// A capacity-bounded resource
///
/// `usage + allocated <= capacity` is enforced by the state store's
/// `resource_capacity` validator, not by this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Resource identifier (matches its key in [`SystemState::resources`])
    pub id: String,
    /// Free-form resource type
    pub resource_type: String,
    /// Total capacity
    pub capacity: f64,
    /// Amount currently in use
    pub usage: f64,
    /// Amount reserved but not yet in use
    pub allocated: f64,
    /// Arbitrary properties
    pub properties: BTreeMap<String, Value>,
}

impl Resource {
    /// Create an unused resource with the given capacity
    pub fn new(id: impl Into<String>, resource_type: impl Into<String>, capacity: f64) -> Self {
        Self {
            id: id.into(),
            resource_type: resource_type.into(),
            capacity,
            usage: 0.0,
            allocated: 0.0,
            properties: BTreeMap::new(),
        }
    }

    /// Set current usage
    pub fn with_usage(mut self, usage: f64) -> Self {
        self.usage = usage;
        self
    }

    /// Set current allocation
    pub fn with_allocated(mut self, allocated: f64) -> Self {
        self.allocated = allocated;
        self
    }

    /// Capacity not yet used or allocated
    pub fn available(&self) -> f64 {
        self.capacity - self.usage - self.allocated
    }

    /// Whether `usage + allocated <= capacity`
    pub fn within_capacity(&self) -> bool {
        self.usage + self.allocated <= self.capacity
    }
}

/// Versioned snapshot of the whole system
///
/// The version increases by exactly 1 per accepted update; the store
/// assigns both `version` and `timestamp` when a proposal is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemState {
    /// State identifier (stable across versions)
    pub id: String,
    /// Monotonic version
    pub version: u64,
    /// Components by ID
    pub components: BTreeMap<String, Component>,
    /// Resources by ID
    pub resources: BTreeMap<String, Resource>,
    /// System-level properties
    pub properties: BTreeMap<String, Value>,
    /// When this version was accepted
    pub timestamp: Timestamp,
}

impl SystemState {
    /// Create an empty state at version 0
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: 0,
            components: BTreeMap::new(),
            resources: BTreeMap::new(),
            properties: BTreeMap::new(),
            timestamp: now(),
        }
    }

    /// Add a component, keyed by its ID
    pub fn with_component(mut self, component: Component) -> Self {
        self.components.insert(component.id.clone(), component);
        self
    }

    /// Add a resource, keyed by its ID
    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resources.insert(resource.id.clone(), resource);
        self
    }

    /// Add a system property
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Look up a component
    pub fn component(&self, id: &str) -> Option<&Component> {
        self.components.get(id)
    }

    /// Look up a resource
    pub fn resource(&self, id: &str) -> Option<&Resource> {
        self.resources.get(id)
    }

    /// Status of a component, treating an absent component as inactive
    pub fn status_of(&self, id: &str) -> ComponentStatus {
        self.components
            .get(id)
            .map(|c| c.status)
            .unwrap_or_default()
    }
}
