//! End-to-end scenarios over the default configuration

use crate::*;
use statecraft::{
    ComponentStatus, Condition, Error, TransitionStatus, TransitionType, ValidationRule,
};

#[test]
fn test_single_status_change_commits() {
    let sc = statecraft();
    let history_before = sc.store().history_len();

    let id = sc.begin("inactive", "active").unwrap();
    sc.add_change(id, StateChange::status("svc-1", "inactive", "active"))
        .unwrap();
    let version = sc.commit(id).unwrap();

    assert_eq!(version, 1);
    assert_eq!(sc.status(id).unwrap(), TransitionStatus::Completed);
    assert_eq!(sc.store().history_len(), history_before + 1);
    assert_eq!(
        sc.current_state().unwrap().status_of("svc-1"),
        ComponentStatus::Active
    );

    let record = sc.coordinator().get_record(id).unwrap();
    assert_eq!(record.transition_type, TransitionType::Activation);
    assert_eq!(record.base_version, Some(0));
    assert_eq!(record.committed_version, Some(1));
    assert!(record.error.is_none());
}

#[test]
fn test_status_outside_table_rolls_back() {
    let sc = statecraft();

    let id = sc.begin("inactive", "active").unwrap();
    sc.add_change(id, StateChange::status("svc-1", "inactive", "active"))
        .unwrap();
    sc.add_change(id, StateChange::status("svc-1", "active", "broken"))
        .unwrap();
    let err = sc.commit(id).unwrap_err();

    assert!(matches!(err, Error::Validation { .. }));
    let status = sc.status(id).unwrap();
    assert!(matches!(
        status,
        TransitionStatus::Failed | TransitionStatus::RolledBack
    ));
    assert_eq!(sc.version().unwrap(), 0);
    assert_eq!(
        sc.current_state().unwrap().status_of("svc-1"),
        ComponentStatus::Inactive
    );
}

#[test]
fn test_rule_registry_is_bounded() {
    let sc = statecraft();
    let limit = sc.engine().options().max_rules;
    assert_eq!(limit, 100);

    for i in 0..limit {
        sc.register_rule(ValidationRule::new(
            format!("rule-{}", i),
            "always",
            Condition::custom("true", |_| Ok(true)),
        ))
        .unwrap();
    }

    let err = sc
        .register_rule(ValidationRule::new(
            "rule-overflow",
            "always",
            Condition::custom("true", |_| Ok(true)),
        ))
        .unwrap_err();
    assert!(matches!(err, Error::Limit(_)));
    assert!(err.is_retryable());
    assert_eq!(sc.engine().rule_count(), limit);
}

#[test]
fn test_activation_then_failure_recovery() {
    let sc = statecraft();
    sc.transition(
        "inactive",
        "active",
        [StateChange::status("svc-1", "inactive", "active")],
    )
    .unwrap();
    sc.transition(
        "active",
        "error",
        [StateChange::status("svc-1", "active", "error")],
    )
    .unwrap();
    sc.transition(
        "error",
        "inactive",
        [StateChange::status("svc-1", "error", "inactive")],
    )
    .unwrap();

    let types: Vec<_> = sc
        .transition_history(10)
        .iter()
        .map(|r| r.transition_type)
        .collect();
    assert_eq!(
        types,
        vec![
            TransitionType::Recovery,
            TransitionType::Failure,
            TransitionType::Activation
        ]
    );
    assert_eq!(sc.version().unwrap(), 3);
}
