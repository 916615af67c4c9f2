//! Validation rules and their conditions

use crate::predicate::{EvalContext, Equals, FieldPath, FnPredicate, InRange, Matches, Predicate};
use statecraft_core::{Result, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Which validation entry point a rule participates in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// Evaluated by `validate_state`
    State,
    /// Evaluated by `validate_transition`, sees both states
    Transition,
}

/// Built-in condition families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionType {
    /// Field equality
    Equals,
    /// Numeric range
    Range,
    /// Regex match
    Regex,
    /// User-supplied predicate
    Custom,
}

/// Predicate plus the metadata reported when it fails
#[derive(Clone)]
pub struct Condition {
    /// Condition family
    pub condition_type: ConditionType,
    /// Human-readable expression; must not be empty
    pub expression: String,
    /// Parameters the predicate was built from (informational)
    pub parameters: BTreeMap<String, Value>,
    /// Message reported when the predicate evaluates to false
    pub error_msg: String,
    predicate: Arc<dyn Predicate>,
}

impl Condition {
    /// `path == expected`
    pub fn equals(path: &str, expected: impl Into<Value>) -> Result<Self> {
        let path = FieldPath::parse(path)?;
        let expected = expected.into();
        let predicate = Equals::new(path.clone(), expected.clone());
        let mut parameters = BTreeMap::new();
        parameters.insert("path".to_string(), Value::from(path.as_str()));
        parameters.insert("expected".to_string(), expected);
        Ok(Self::build(ConditionType::Equals, predicate, parameters))
    }

    /// `min <= path <= max`; pass `None` for an open bound
    pub fn range(path: &str, min: Option<f64>, max: Option<f64>) -> Result<Self> {
        let path = FieldPath::parse(path)?;
        let predicate = InRange::new(path.clone(), min, max)?;
        let mut parameters = BTreeMap::new();
        parameters.insert("path".to_string(), Value::from(path.as_str()));
        if let Some(lo) = min {
            parameters.insert("min".to_string(), Value::Float(lo));
        }
        if let Some(hi) = max {
            parameters.insert("max".to_string(), Value::Float(hi));
        }
        Ok(Self::build(ConditionType::Range, predicate, parameters))
    }

    /// String at `path` matches `pattern`
    pub fn matches(path: &str, pattern: &str) -> Result<Self> {
        let path = FieldPath::parse(path)?;
        let predicate = Matches::new(path.clone(), pattern)?;
        let mut parameters = BTreeMap::new();
        parameters.insert("path".to_string(), Value::from(path.as_str()));
        parameters.insert("pattern".to_string(), Value::from(pattern));
        Ok(Self::build(ConditionType::Regex, predicate, parameters))
    }

    /// Closure predicate; `expression` describes it in reports
    pub fn custom<F>(expression: impl Into<String>, f: F) -> Self
    where
        F: Fn(&EvalContext<'_>) -> Result<bool> + Send + Sync + 'static,
    {
        let expression = expression.into();
        Self::from_predicate(
            ConditionType::Custom,
            expression.clone(),
            Arc::new(FnPredicate::new(expression, f)),
        )
    }

    /// Wrap any predicate implementation
    pub fn from_predicate(
        condition_type: ConditionType,
        expression: impl Into<String>,
        predicate: Arc<dyn Predicate>,
    ) -> Self {
        let expression = expression.into();
        Self {
            condition_type,
            error_msg: format!("condition failed: {}", expression),
            expression,
            parameters: BTreeMap::new(),
            predicate,
        }
    }

    fn build<P: Predicate + 'static>(
        condition_type: ConditionType,
        predicate: P,
        parameters: BTreeMap<String, Value>,
    ) -> Self {
        let mut condition =
            Self::from_predicate(condition_type, predicate.describe(), Arc::new(predicate));
        condition.parameters = parameters;
        condition
    }

    /// Override the failure message
    pub fn with_error_msg(mut self, msg: impl Into<String>) -> Self {
        self.error_msg = msg.into();
        self
    }

    /// Evaluate the underlying predicate
    pub fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<bool> {
        self.predicate.evaluate(ctx)
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condition")
            .field("condition_type", &self.condition_type)
            .field("expression", &self.expression)
            .field("parameters", &self.parameters)
            .field("error_msg", &self.error_msg)
            .finish_non_exhaustive()
    }
}

/// A registered validation rule
///
/// Rules are evaluated in ascending `priority` order; rules with equal
/// priority keep their registration order.
#[derive(Debug, Clone)]
pub struct ValidationRule {
    /// Unique identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Entry point this rule runs in
    pub kind: RuleKind,
    /// What the rule is about (informational, `*` for everything)
    pub target: String,
    /// Predicate and failure metadata
    pub condition: Condition,
    /// Lower runs first
    pub priority: i32,
    /// Disabled rules are skipped
    pub enabled: bool,
}

impl ValidationRule {
    /// Create an enabled state rule with priority 0
    pub fn new(id: impl Into<String>, name: impl Into<String>, condition: Condition) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: RuleKind::State,
            target: "*".to_string(),
            condition,
            priority: 0,
            enabled: true,
        }
    }

    /// Make this a transition rule
    pub fn for_transitions(mut self) -> Self {
        self.kind = RuleKind::Transition;
        self
    }

    /// Set the priority
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the informational target
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    /// Register the rule disabled
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}
