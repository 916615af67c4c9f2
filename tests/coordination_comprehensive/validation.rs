//! Rules and validators guarding updates and commits

use crate::*;
use statecraft::{
    ChangeType, Condition, EvalContext, RuleKind, TransitionStatus, ValidationRule, Value,
};

fn mode_rule() -> ValidationRule {
    ValidationRule::new(
        "mode-normal",
        "mode stays normal",
        Condition::equals("properties.mode", "normal").unwrap(),
    )
}

fn health_rule() -> ValidationRule {
    ValidationRule::new(
        "svc-1-healthy",
        "svc-1 health at least 0.9",
        Condition::range("components.svc-1.health", Some(0.9), None).unwrap(),
    )
    .with_priority(-1)
}

fn degraded() -> SystemState {
    let mut state = base_state().with_property("mode", "degraded");
    if let Some(svc) = state.components.get_mut("svc-1") {
        svc.health = 0.5;
    }
    state
}

#[test]
fn test_lenient_reports_every_failure() {
    let sc = Statecraft::builder()
        .lenient()
        .initial_state(base_state())
        .build()
        .unwrap();
    sc.register_rule(mode_rule()).unwrap();
    sc.register_rule(health_rule()).unwrap();

    let err = sc.update_state(degraded()).unwrap_err();
    let ids: Vec<_> = err.failures().iter().map(|f| f.rule_id.as_str()).collect();
    assert_eq!(ids, vec!["svc-1-healthy", "mode-normal"]);
    assert!(!err.is_retryable());
}

#[test]
fn test_strict_stops_at_first_failure() {
    let sc = statecraft();
    sc.register_rule(mode_rule()).unwrap();
    sc.register_rule(health_rule()).unwrap();

    let err = sc.update_state(degraded()).unwrap_err();
    assert_eq!(err.failures().len(), 1);
    assert_eq!(err.failures()[0].rule_id, "svc-1-healthy");
    assert_eq!(sc.version().unwrap(), 0);
}

#[test]
fn test_transition_rule_sees_both_states() {
    let sc = statecraft();
    sc.register_rule(
        ValidationRule::new(
            "capacity-stable",
            "cpu capacity never shrinks",
            Condition::custom("cpu capacity >= previous", |ctx: &EvalContext<'_>| {
                let capacity = |s: &SystemState| s.resource("cpu").map_or(0.0, |r| r.capacity);
                Ok(ctx
                    .current
                    .map_or(true, |current| capacity(ctx.state) >= capacity(current)))
            }),
        )
        .for_transitions(),
    )
    .unwrap();
    assert_eq!(sc.engine().rules()[0].kind, RuleKind::Transition);

    let mut shrunk = base_state();
    if let Some(cpu) = shrunk.resources.get_mut("cpu") {
        cpu.capacity = 2.0;
    }
    assert!(sc.engine().validate_state(&shrunk).is_ok());

    let err = sc.update_state(shrunk).unwrap_err();
    assert_eq!(err.failures()[0].rule_id, "capacity-stable");
}

#[test]
fn test_capacity_validator_rejects_commit() {
    let sc = statecraft();
    let id = sc.begin("active", "active").unwrap();
    sc.add_change(
        id,
        StateChange::new(ChangeType::ResourceAllocation, "cpu", 0.0, 12.0),
    )
    .unwrap();

    let err = sc.commit(id).unwrap_err();
    assert_eq!(err.failures()[0].rule_id, "validator:resource_capacity");
    assert_eq!(sc.status(id).unwrap(), TransitionStatus::RolledBack);
    assert_eq!(sc.current_state().unwrap().resource("cpu").unwrap().allocated, 0.0);
}

#[test]
fn test_custom_validator_rejects_commit() {
    let sc = statecraft();
    sc.register_validator("db-stays-down", |_: &SystemState, next: &SystemState| {
        if next.status_of("db") == statecraft::ComponentStatus::Active {
            Err(StateError::validation("db activation is frozen"))
        } else {
            Ok(())
        }
    });
    assert_eq!(
        sc.store().validator_names(),
        vec!["db-stays-down", "resource_capacity"]
    );

    let err = sc
        .transition(
            "inactive",
            "active",
            [StateChange::status("db", "inactive", "active")],
        )
        .unwrap_err();
    assert!(err.to_string().contains("frozen"));
    assert_eq!(sc.version().unwrap(), 0);
}

#[test]
fn test_out_of_range_health_is_structural_failure() {
    let sc = statecraft();
    let err = sc
        .transition(
            "active",
            "active",
            [StateChange::new(ChangeType::ComponentHealth, "svc-1", 1.0, 1.5)],
        )
        .unwrap_err();
    assert_eq!(err.failures()[0].rule_id, "builtin:component_health");
}

#[test]
fn test_repeated_validation_hits_cache() {
    let sc = statecraft();
    sc.register_rule(mode_rule()).unwrap();
    let state = sc.current_state().unwrap();

    sc.engine().validate_state(&state).unwrap();
    sc.engine().validate_state(&state).unwrap();

    let metrics = sc.metrics().validation;
    assert!(metrics.cache_hits >= 1);
    assert!(metrics.total >= 2);
    assert_eq!(metrics.failed, 0);
}

#[test]
fn test_rule_evaluation_error_is_reported() {
    let sc = statecraft();
    sc.register_rule(ValidationRule::new(
        "broken",
        "always errors",
        Condition::custom("boom", |_| Err(StateError::internal("boom"))),
    ))
    .unwrap();

    let err = sc
        .update_state(base_state().with_property("touched", Value::Bool(true)))
        .unwrap_err();
    assert!(err.failures()[0].message.starts_with("evaluation error"));
}
