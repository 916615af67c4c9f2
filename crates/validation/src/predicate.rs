//! Rule predicates
//!
//! A [`Predicate`] decides whether a state (or a `(current, next)` pair)
//! is acceptable. The engine never parses rule expressions itself; each
//! condition carries a predicate object. Built-ins:
//!
//! - [`Equals`]: field equals a value
//! - [`InRange`]: numeric field within inclusive bounds
//! - [`Matches`]: string field matches a regex
//! - [`FnPredicate`]: arbitrary closure, the extension point for richer DSLs
//!
//! Built-ins address fields with a [`FieldPath`]:
//!
//! | Path | Resolves to |
//! |------|-------------|
//! | `id` / `version` | state ID / version |
//! | `properties.<key>` | system property |
//! | `components.<id>.status` | `"inactive"`, `"active"` or `"error"` |
//! | `components.<id>.health` / `.type` | health / component type |
//! | `components.<id>.properties.<key>` | component property |
//! | `resources.<id>.capacity` / `.usage` / `.allocated` / `.available` / `.type` | resource fields |
//! | `resources.<id>.properties.<key>` | resource property |
//!
//! Paths that do not resolve evaluate to [`Value::Null`].

use regex::Regex;
use statecraft_core::{Result, StateError, SystemState, Value};
use std::fmt;
use std::str::FromStr;

/// What a predicate is evaluated against
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    /// The state being validated (the `next` state for transitions)
    pub state: &'a SystemState,
    /// The state being replaced, present for transition validation
    pub current: Option<&'a SystemState>,
}

impl<'a> EvalContext<'a> {
    /// Context for validating a single state
    pub fn for_state(state: &'a SystemState) -> Self {
        Self {
            state,
            current: None,
        }
    }

    /// Context for validating `current -> next`
    pub fn for_transition(current: &'a SystemState, next: &'a SystemState) -> Self {
        Self {
            state: next,
            current: Some(current),
        }
    }
}

/// Abstract rule condition
pub trait Predicate: Send + Sync {
    /// Evaluate against the context; `Err` means the predicate could not be
    /// evaluated at all, which the engine reports as a failing rule.
    fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<bool>;

    /// Short human-readable description
    fn describe(&self) -> String {
        "custom predicate".to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Field {
    Id,
    Version,
    Property(String),
    ComponentStatus(String),
    ComponentHealth(String),
    ComponentType(String),
    ComponentProperty(String, String),
    ResourceCapacity(String),
    ResourceUsage(String),
    ResourceAllocated(String),
    ResourceAvailable(String),
    ResourceType(String),
    ResourceProperty(String, String),
}

/// Parsed field selector (see module docs for the grammar)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    raw: String,
    field: Field,
}

impl FieldPath {
    /// Parse a path
    pub fn parse(path: &str) -> Result<Self> {
        let parts: Vec<&str> = path.split('.').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(invalid_path(path));
        }

        let field = match parts.as_slice() {
            ["id"] => Field::Id,
            ["version"] => Field::Version,
            ["properties", key] => Field::Property(key.to_string()),
            ["components", id, "status"] => Field::ComponentStatus(id.to_string()),
            ["components", id, "health"] => Field::ComponentHealth(id.to_string()),
            ["components", id, "type"] => Field::ComponentType(id.to_string()),
            ["components", id, "properties", key] => {
                Field::ComponentProperty(id.to_string(), key.to_string())
            }
            ["resources", id, "capacity"] => Field::ResourceCapacity(id.to_string()),
            ["resources", id, "usage"] => Field::ResourceUsage(id.to_string()),
            ["resources", id, "allocated"] => Field::ResourceAllocated(id.to_string()),
            ["resources", id, "available"] => Field::ResourceAvailable(id.to_string()),
            ["resources", id, "type"] => Field::ResourceType(id.to_string()),
            ["resources", id, "properties", key] => {
                Field::ResourceProperty(id.to_string(), key.to_string())
            }
            _ => return Err(invalid_path(path)),
        };

        Ok(Self {
            raw: path.to_string(),
            field,
        })
    }

    /// The path as written
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Resolve against a state
    pub fn resolve(&self, state: &SystemState) -> Value {
        let resolved = match &self.field {
            Field::Id => Some(Value::from(state.id.as_str())),
            Field::Version => Some(Value::Int(state.version as i64)),
            Field::Property(key) => state.properties.get(key).cloned(),
            Field::ComponentStatus(id) => state.component(id).map(|c| c.status.into()),
            Field::ComponentHealth(id) => state.component(id).map(|c| Value::Float(c.health)),
            Field::ComponentType(id) => state
                .component(id)
                .map(|c| Value::from(c.component_type.as_str())),
            Field::ComponentProperty(id, key) => state
                .component(id)
                .and_then(|c| c.properties.get(key).cloned()),
            Field::ResourceCapacity(id) => state.resource(id).map(|r| Value::Float(r.capacity)),
            Field::ResourceUsage(id) => state.resource(id).map(|r| Value::Float(r.usage)),
            Field::ResourceAllocated(id) => state.resource(id).map(|r| Value::Float(r.allocated)),
            Field::ResourceAvailable(id) => state.resource(id).map(|r| Value::Float(r.available())),
            Field::ResourceType(id) => state
                .resource(id)
                .map(|r| Value::from(r.resource_type.as_str())),
            Field::ResourceProperty(id, key) => state
                .resource(id)
                .and_then(|r| r.properties.get(key).cloned()),
        };
        resolved.unwrap_or(Value::Null)
    }
}

impl FromStr for FieldPath {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self> {
        FieldPath::parse(s)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn invalid_path(path: &str) -> StateError {
    StateError::validation(format!("invalid field path '{}'", path))
}

/// `path == expected`
#[derive(Debug, Clone)]
pub struct Equals {
    path: FieldPath,
    expected: Value,
}

impl Equals {
    /// Create an equality predicate
    pub fn new(path: FieldPath, expected: Value) -> Self {
        Self { path, expected }
    }
}

impl Predicate for Equals {
    fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<bool> {
        Ok(self.path.resolve(ctx.state) == self.expected)
    }

    fn describe(&self) -> String {
        format!("{} == {}", self.path, self.expected)
    }
}

/// `min <= path <= max` for numeric fields; non-numeric values fail
#[derive(Debug, Clone)]
pub struct InRange {
    path: FieldPath,
    min: Option<f64>,
    max: Option<f64>,
}

impl InRange {
    /// Create a range predicate; at least one bound should be set
    pub fn new(path: FieldPath, min: Option<f64>, max: Option<f64>) -> Result<Self> {
        if min.is_none() && max.is_none() {
            return Err(StateError::validation(format!(
                "range on '{}' needs at least one bound",
                path
            )));
        }
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo > hi {
                return Err(StateError::validation(format!(
                    "range on '{}' has min {} > max {}",
                    path, lo, hi
                )));
            }
        }
        Ok(Self { path, min, max })
    }
}

impl Predicate for InRange {
    fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<bool> {
        let Some(n) = self.path.resolve(ctx.state).as_number() else {
            return Ok(false);
        };
        Ok(self.min.map_or(true, |lo| n >= lo) && self.max.map_or(true, |hi| n <= hi))
    }

    fn describe(&self) -> String {
        let lo = self.min.map(|v| v.to_string()).unwrap_or_else(|| "-inf".into());
        let hi = self.max.map(|v| v.to_string()).unwrap_or_else(|| "+inf".into());
        format!("{} in [{}, {}]", self.path, lo, hi)
    }
}

/// String field matches a regex; non-string values fail
#[derive(Debug, Clone)]
pub struct Matches {
    path: FieldPath,
    pattern: Regex,
}

impl Matches {
    /// Compile the pattern
    pub fn new(path: FieldPath, pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern).map_err(|e| {
            StateError::validation(format!("invalid pattern for '{}': {}", path, e))
        })?;
        Ok(Self { path, pattern })
    }
}

impl Predicate for Matches {
    fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<bool> {
        Ok(match self.path.resolve(ctx.state) {
            Value::String(s) => self.pattern.is_match(&s),
            _ => false,
        })
    }

    fn describe(&self) -> String {
        format!("{} =~ /{}/", self.path, self.pattern.as_str())
    }
}

/// Closure-backed predicate
pub struct FnPredicate<F> {
    description: String,
    f: F,
}

impl<F> FnPredicate<F>
where
    F: Fn(&EvalContext<'_>) -> Result<bool> + Send + Sync,
{
    /// Wrap a closure
    pub fn new(description: impl Into<String>, f: F) -> Self {
        Self {
            description: description.into(),
            f,
        }
    }
}

impl<F> Predicate for FnPredicate<F>
where
    F: Fn(&EvalContext<'_>) -> Result<bool> + Send + Sync,
{
    fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<bool> {
        (self.f)(ctx)
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}
