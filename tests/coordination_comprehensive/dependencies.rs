//! Dependency ordering and cycle rejection

use crate::*;
use proptest::prelude::*;
use statecraft::{ChangeId, ChangeType, Error, TransitionStatus};

fn build(n: usize, atomic: bool) -> (Statecraft, Arc<RecordingExecutor>) {
    let recorder = RecordingExecutor::shared();
    let builder = Statecraft::builder()
        .executor(recorder.clone())
        .initial_state(numbered_state(n));
    let builder = if atomic {
        builder.atomic()
    } else {
        builder.concurrent()
    };
    (builder.build().unwrap(), recorder)
}

fn set(key: usize) -> StateChange {
    StateChange::new(ChangeType::StateUpdate, format!("k{}", key), 0, 1)
}

fn arb_edges() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (2usize..8).prop_flat_map(|n| (Just(n), prop::collection::vec((0..n, 0..n), 0..12)))
}

/// Commit `n` changes with `(change, depends_on)` edges
fn commit_with_edges(
    sc: &Statecraft,
    n: usize,
    edges: &[(usize, usize)],
) -> Result<u64, Error> {
    let id = sc.begin("active", "active")?;
    for i in 0..n {
        sc.add_change(id, set(i))?;
    }
    for &(change, depends_on) in edges {
        sc.add_dependency(id, ChangeId(change as u32), ChangeId(depends_on as u32))?;
    }
    sc.commit(id)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_atomic_never_runs_ahead_of_dependencies((n, pairs) in arb_edges()) {
        let (sc, recorder) = build(n, true);
        let edges: Vec<_> = pairs
            .into_iter()
            .filter(|(a, b)| a != b)
            .map(|(a, b)| (a.max(b), a.min(b)))
            .collect();

        prop_assert_eq!(commit_with_edges(&sc, n, &edges).unwrap(), 1);
        prop_assert_eq!(recorder.applied().len(), n);
        for (change, dep) in edges {
            let change_at = recorder.position(&format!("k{}", change)).unwrap();
            let dep_at = recorder.position(&format!("k{}", dep)).unwrap();
            prop_assert!(dep_at < change_at);
        }
    }

    #[test]
    fn prop_concurrent_honours_forward_dependencies((n, pairs) in arb_edges()) {
        let (sc, recorder) = build(n, false);
        let edges: Vec<_> = pairs
            .into_iter()
            .filter(|(a, b)| a != b)
            .map(|(a, b)| (a.min(b), a.max(b)))
            .collect();

        prop_assert_eq!(commit_with_edges(&sc, n, &edges).unwrap(), 1);
        prop_assert_eq!(recorder.applied().len(), n);
        for (change, dep) in edges {
            let change_at = recorder.position(&format!("k{}", change)).unwrap();
            let dep_at = recorder.position(&format!("k{}", dep)).unwrap();
            prop_assert!(dep_at < change_at);
        }
    }
}

#[test]
fn test_cycle_is_rejected_before_execution() {
    for atomic in [true, false] {
        let (sc, recorder) = build(3, atomic);
        let err = commit_with_edges(&sc, 3, &[(0, 1), (1, 2), (2, 0)]).unwrap_err();

        assert!(matches!(err, Error::Dependency(_)));
        assert!(recorder.applied().is_empty());
        assert_eq!(sc.version().unwrap(), 0);
        let record = &sc.transition_history(1)[0];
        assert_eq!(record.status, TransitionStatus::Failed);
    }
}

#[test]
fn test_atomic_mode_rejects_forward_dependency() {
    let (sc, recorder) = build(2, true);
    let err = commit_with_edges(&sc, 2, &[(0, 1)]).unwrap_err();

    assert!(matches!(err, Error::Dependency(_)));
    assert!(recorder.applied().is_empty());
    assert_eq!(sc.version().unwrap(), 0);
}

#[test]
fn test_dependency_on_unknown_change() {
    let (sc, _) = build(2, true);
    let id = sc.begin("active", "active").unwrap();
    sc.add_change(id, set(0)).unwrap();

    let err = sc.add_dependency(id, ChangeId(0), ChangeId(5)).unwrap_err();
    assert!(err.is_not_found());
    let err = sc.add_dependency(id, ChangeId(0), ChangeId(0)).unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));
}

#[test]
fn test_inline_dependency_orders_concurrent_changes() {
    let (sc, recorder) = build(3, false);
    let id = sc.begin("active", "active").unwrap();
    sc.add_change(id, set(0).depends_on(ChangeId(2))).unwrap();
    sc.add_change(id, set(1).depends_on(ChangeId(0))).unwrap();
    sc.add_change(id, set(2)).unwrap();
    sc.commit(id).unwrap();

    assert_eq!(recorder.applied(), vec!["k2", "k0", "k1"]);
}

#[test]
fn test_same_target_changes_apply_in_order() {
    let recorder = RecordingExecutor::shared();
    let sc = Statecraft::builder()
        .concurrent()
        .executor(recorder.clone())
        .initial_state(base_state())
        .build()
        .unwrap();

    sc.transition(
        "inactive",
        "inactive",
        [
            StateChange::status("svc-1", "inactive", "active"),
            StateChange::status("svc-1", "active", "inactive"),
        ],
    )
    .unwrap();
    assert_eq!(recorder.applied(), vec!["svc-1", "svc-1"]);
    assert_eq!(sc.version().unwrap(), 1);
}
