//! All-or-nothing commits

use crate::*;
use proptest::prelude::*;
use statecraft::{ChangeType, Error, StepStatus, TransitionStatus};

fn update(key: usize, old: i32, new: i32) -> StateChange {
    StateChange::new(ChangeType::StateUpdate, format!("k{}", key), old, new)
}

/// Build an `n`-change transition whose change `k` is stale and commit it
fn commit_with_failure_at(n: usize, k: usize) -> (Statecraft, statecraft::TransitionId, Error) {
    commit_failing(Statecraft::new(numbered_state(n)).unwrap(), n, k)
}

/// Same as `commit_with_failure_at`, on a bounded pool of parallel workers
fn commit_concurrent_with_failure_at(
    n: usize,
    k: usize,
) -> (Statecraft, statecraft::TransitionId, Error) {
    let sc = Statecraft::builder()
        .concurrent()
        .max_workers(4)
        .initial_state(numbered_state(n))
        .build()
        .unwrap();
    commit_failing(sc, n, k)
}

fn commit_failing(
    sc: Statecraft,
    n: usize,
    k: usize,
) -> (Statecraft, statecraft::TransitionId, Error) {
    let id = sc.begin("active", "active").unwrap();
    for i in 0..n {
        let old = if i == k { 99 } else { 0 };
        sc.add_change(id, update(i, old, i as i32 + 1)).unwrap();
    }
    let err = sc.commit(id).unwrap_err();
    (sc, id, err)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_failed_commit_leaves_state_unchanged((n, k) in (1usize..8).prop_flat_map(|n| (Just(n), 0..n))) {
        let (sc, id, err) = commit_with_failure_at(n, k);

        prop_assert!(matches!(err, Error::Validation { .. }), "expected Error::Validation");
        prop_assert_eq!(sc.version().unwrap(), 0);
        let current = sc.current_state().unwrap();
        for i in 0..n {
            prop_assert_eq!(current.properties.get(&format!("k{}", i)), Some(&statecraft::Value::Int(0)));
        }
        prop_assert_eq!(sc.status(id).unwrap(), TransitionStatus::RolledBack);
        prop_assert_eq!(sc.metrics().coordinator.rolled_back, 1);
    }

    #[test]
    fn prop_failed_concurrent_commit_leaves_state_unchanged((n, k) in (1usize..12).prop_flat_map(|n| (Just(n), 0..n))) {
        let (sc, id, err) = commit_concurrent_with_failure_at(n, k);

        prop_assert!(matches!(err, Error::Validation { .. }), "expected Error::Validation");
        prop_assert_eq!(sc.version().unwrap(), 0);
        let current = sc.current_state().unwrap();
        for i in 0..n {
            prop_assert_eq!(current.properties.get(&format!("k{}", i)), Some(&statecraft::Value::Int(0)));
        }
        prop_assert_eq!(sc.status(id).unwrap(), TransitionStatus::RolledBack);

        let plan = sc.coordinator().get_record(id).unwrap().rollback.unwrap();
        prop_assert_eq!(plan.steps[k].status, StepStatus::Skipped);
        prop_assert!(plan.steps.iter().all(|s| s.status != StepStatus::Failed));
    }
}

#[test]
fn test_rollback_plan_records_undone_steps() {
    let (sc, id, _) = commit_with_failure_at(4, 2);

    let record = sc.coordinator().get_record(id).unwrap();
    let plan = record.rollback.expect("rollback plan recorded");
    let statuses: Vec<_> = plan.steps.iter().map(|s| s.status).collect();
    assert_eq!(
        statuses,
        vec![
            StepStatus::Completed,
            StepStatus::Completed,
            StepStatus::Skipped,
            StepStatus::Skipped
        ]
    );
    assert!(plan.steps.iter().all(|s| s.action == "revert"));
}

#[test]
fn test_irreversible_change_fails_transition() {
    let sc = Statecraft::new(numbered_state(2)).unwrap();
    let id = sc.begin("active", "active").unwrap();
    sc.add_change(id, update(0, 0, 1).irreversible()).unwrap();
    sc.add_change(id, update(1, 42, 1)).unwrap();

    let err = sc.commit(id).unwrap_err();
    assert!(matches!(err, Error::Reversibility(_)));
    assert!(err.is_fatal());

    let status = sc.status(id).unwrap();
    assert_ne!(status, TransitionStatus::Completed);
    assert_eq!(status, TransitionStatus::Failed);
    assert_eq!(sc.version().unwrap(), 0);

    let record = sc.coordinator().get_record(id).unwrap();
    assert!(record.error.unwrap().contains("rollback"));
    assert_eq!(sc.metrics().coordinator.failed, 1);
}

#[test]
fn test_irreversible_change_commits_when_nothing_fails() {
    let sc = Statecraft::new(numbered_state(2)).unwrap();
    let id = sc.begin("active", "active").unwrap();
    sc.add_change(id, update(0, 0, 1).irreversible()).unwrap();
    sc.add_change(id, update(1, 0, 1)).unwrap();

    assert_eq!(sc.commit(id).unwrap(), 1);
    assert_eq!(sc.status(id).unwrap(), TransitionStatus::Completed);
}

#[test]
fn test_rule_rejecting_result_rolls_back() {
    let sc = statecraft();
    sc.register_rule(statecraft::ValidationRule::new(
        "mode",
        "mode stays normal",
        statecraft::Condition::equals("properties.mode", "normal").unwrap(),
    ))
    .unwrap();

    let id = sc.begin("active", "active").unwrap();
    sc.add_change(id, StateChange::status("svc-1", "inactive", "active"))
        .unwrap();
    sc.add_change(
        id,
        StateChange::new(ChangeType::StateUpdate, "mode", "normal", "degraded"),
    )
    .unwrap();

    let err = sc.commit(id).unwrap_err();
    assert_eq!(err.failures()[0].rule_id, "mode");
    assert_eq!(sc.status(id).unwrap(), TransitionStatus::RolledBack);
    assert_eq!(
        sc.current_state().unwrap().status_of("svc-1"),
        statecraft::ComponentStatus::Inactive
    );
}
