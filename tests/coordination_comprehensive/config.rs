//! Loading configuration from TOML files

use crate::*;
use statecraft::{Config, Error};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_file_configures_every_component() {
    let file = write_config(
        r#"
        [validation]
        strict_mode = false
        max_rules = 5
        cache_ttl_ms = 500

        [store]
        max_state_history = 2

        [coordinator]
        atomic_mode = false
        timeout_ms = 1500
        retry_limit = 1
        "#,
    );

    let sc = Statecraft::from_config_file(file.path(), base_state()).unwrap();
    let validation = sc.engine().options();
    assert!(!validation.strict_mode);
    assert_eq!(validation.max_rules, 5);
    assert_eq!(validation.cache_ttl, Duration::from_millis(500));
    assert_eq!(sc.store().options().max_state_history, 2);

    let coordinator = sc.coordinator().options();
    assert!(!coordinator.atomic_mode);
    assert_eq!(coordinator.timeout, Some(Duration::from_millis(1500)));
    assert_eq!(coordinator.retry_limit, 1);
}

#[test]
fn test_missing_sections_use_defaults() {
    let file = write_config("[store]\nmax_transition_log = 10\n");
    let config = Config::from_file(file.path()).unwrap();

    assert_eq!(config.validation, Config::default().validation);
    assert_eq!(config.coordinator, Config::default().coordinator);
    assert_eq!(config.store.max_transition_log, 10);
    assert_eq!(config.store.max_state_history, 100);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::from_file(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn test_invalid_values_are_config_errors() {
    let file = write_config("[coordinator]\nmax_transitions = \"many\"\n");
    let err = Statecraft::from_config_file(file.path(), base_state()).unwrap_err();
    assert!(matches!(err, Error::Config(_)));

    let file = write_config("[coordinator]\nmax_transitions = 0\n");
    let err = Statecraft::from_config_file(file.path(), base_state()).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}
