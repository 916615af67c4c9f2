//! Version numbering and bounded history

use crate::*;
use proptest::prelude::*;
use statecraft::{ChangeType, Config};

fn bump(sc: &Statecraft, i: usize) -> u64 {
    sc.update_state(base_state().with_property("step", i as i64))
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_versions_increase_and_history_is_fifo(updates in 1usize..16, max_history in 1usize..6) {
        let sc = Statecraft::builder()
            .max_state_history(max_history)
            .initial_state(base_state())
            .build()
            .unwrap();

        for i in 0..updates {
            prop_assert_eq!(bump(&sc, i), i as u64 + 1);
        }

        let history = sc.state_history(usize::MAX);
        prop_assert_eq!(history.len(), updates.min(max_history));
        let versions: Vec<u64> = history.iter().map(|s| s.version()).collect();
        let expected: Vec<u64> = (0..updates as u64).rev().take(max_history).collect();
        prop_assert_eq!(versions, expected);

        let oldest_kept = updates.saturating_sub(max_history) as u64;
        if oldest_kept > 0 {
            prop_assert!(sc.store().get_snapshot(0).is_err());
        }
        prop_assert!(sc.store().get_snapshot(oldest_kept).is_ok());
    }
}

#[test]
fn test_transition_log_links_snapshots() {
    let sc = statecraft();
    for i in 0..3 {
        bump(&sc, i);
    }

    let log = sc.store().transition_log(10);
    assert_eq!(log.len(), 3);
    assert_eq!(log[0].to_version, 3);
    for pair in log.windows(2) {
        assert_eq!(pair[1].to_snapshot, pair[0].from_snapshot);
        assert_eq!(pair[1].to_version, pair[0].from_version);
    }

    let snapshot = sc.store().get_snapshot(1).unwrap();
    assert_eq!(snapshot.id, log[1].from_snapshot);
    assert_eq!(snapshot.state.properties.get("step"), Some(&statecraft::Value::Int(0)));
}

#[test]
fn test_transition_history_is_bounded() {
    let mut config = Config::default();
    config.coordinator.max_history = 3;
    let sc = Statecraft::builder()
        .config(config)
        .initial_state(base_state())
        .build()
        .unwrap();

    for i in 0..5 {
        sc.transition(
            "active",
            "active",
            [StateChange::new(
                ChangeType::StateUpdate,
                format!("t{}", i),
                false,
                true,
            )],
        )
        .unwrap();
    }

    let records = sc.transition_history(10);
    assert_eq!(records.len(), 3);
    let committed: Vec<_> = records.iter().map(|r| r.committed_version).collect();
    assert_eq!(committed, vec![Some(5), Some(4), Some(3)]);
    assert_eq!(sc.metrics().coordinator.committed, 5);
}

#[test]
fn test_failed_commit_adds_no_snapshot() {
    let sc = statecraft();
    let before = sc.store().history_len();
    let _ = sc.transition(
        "inactive",
        "active",
        [StateChange::status("svc-1", "active", "inactive")],
    );

    assert_eq!(sc.store().history_len(), before);
    assert!(sc.store().transition_log(10).is_empty());
    assert_eq!(sc.metrics().version, Some(0));
}
