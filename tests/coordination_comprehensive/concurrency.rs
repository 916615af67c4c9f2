//! Multi-threaded access to one instance

use crate::*;
use statecraft::{ChangeType, Error, TransitionStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Barrier;
use std::thread;
use std::time::Duration;

fn flag(key: String) -> StateChange {
    StateChange::new(ChangeType::StateUpdate, key, false, true)
}

#[test]
fn test_reads_without_writes_are_identical() {
    let sc = statecraft();
    let a = sc.current_state().unwrap();
    let b = sc.current_state().unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(*a, *b);
}

#[test]
fn test_parallel_transitions_all_commit() {
    const THREADS: usize = 8;
    let sc = Arc::new(statecraft());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let sc = Arc::clone(&sc);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                sc.transition("active", "active", [flag(format!("worker-{}", i))])
            })
        })
        .collect();

    let mut versions: Vec<u64> = handles
        .into_iter()
        .map(|h| h.join().unwrap().unwrap())
        .collect();
    versions.sort_unstable();

    assert_eq!(versions, (1..=THREADS as u64).collect::<Vec<_>>());
    let state = sc.current_state().unwrap();
    assert_eq!(state.version, THREADS as u64);
    for i in 0..THREADS {
        assert!(state.properties.contains_key(&format!("worker-{}", i)));
    }
    assert_eq!(sc.metrics().coordinator.committed, THREADS as u64);
    assert_eq!(sc.coordinator().active_count(), 0);
}

#[test]
fn test_readers_see_monotonic_versions() {
    let sc = Arc::new(statecraft());
    let done = Arc::new(AtomicBool::new(false));

    let reader = {
        let sc = Arc::clone(&sc);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut last = 0;
            while !done.load(Ordering::Acquire) {
                let version = sc.current_state().unwrap().version;
                assert!(version >= last);
                last = version;
            }
        })
    };

    for i in 0..20 {
        let result = sc.transition("active", "active", [flag(format!("w{}", i))]);
        if result.is_err() {
            done.store(true, Ordering::Release);
        }
        result.unwrap();
    }
    done.store(true, Ordering::Release);
    reader.join().unwrap();
    assert_eq!(sc.version().unwrap(), 20);
}

#[test]
fn test_dispatch_and_wait() {
    let sc = statecraft();
    let id = sc.begin("inactive", "active").unwrap();
    sc.add_change(id, StateChange::status("svc-2", "inactive", "active"))
        .unwrap();

    let handle = sc.dispatch(id).unwrap();
    assert_eq!(handle.id(), id);
    assert_eq!(handle.wait().unwrap(), 1);
    assert_eq!(sc.status(id).unwrap(), TransitionStatus::Completed);
}

#[test]
fn test_commit_respects_timeout() {
    struct Slow;
    impl ChangeExecutor for Slow {
        fn apply(&self, change: &StateChange, state: &mut SystemState) -> Result<(), StateError> {
            thread::sleep(Duration::from_millis(30));
            DefaultExecutor.apply(change, state)
        }
    }

    let sc = Statecraft::builder()
        .timeout(Duration::from_millis(10))
        .executor(Arc::new(Slow))
        .initial_state(base_state())
        .build()
        .unwrap();

    let err = sc
        .transition(
            "active",
            "active",
            [flag("a".to_string()), flag("b".to_string())],
        )
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled(_)));
    assert!(err.is_retryable());
    assert_eq!(sc.version().unwrap(), 0);
    assert!(!sc.current_state().unwrap().properties.contains_key("a"));
}

#[test]
fn test_open_transitions_are_bounded() {
    let sc = Statecraft::builder()
        .max_transitions(2)
        .initial_state(base_state())
        .build()
        .unwrap();

    let first = sc.begin("inactive", "active").unwrap();
    sc.begin("inactive", "active").unwrap();
    let err = sc.begin("inactive", "active").unwrap_err();
    assert!(matches!(err, Error::Limit(_)));

    sc.abort(first).unwrap();
    sc.begin("inactive", "active").unwrap();
}
