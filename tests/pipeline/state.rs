use std::fs;

use panacea::{
    error::CorpusError,
    state::{ProcessingState, StateStore},
};

use crate::support::Workspace;

#[test]
fn given_missing_state_file_when_load_then_none_and_default_are_returned() {
    let workspace = Workspace::new("state-missing");
    let store = StateStore::new(workspace.root.join("state/none.json"));

    assert!(store.load().expect("missing file is not an error").is_none());
    assert_eq!(
        store.load_or_default().expect("default"),
        ProcessingState::default()
    );
}

#[test]
fn given_successive_runs_when_record_run_then_counters_accumulate() {
    let workspace = Workspace::new("state-runs");
    let store = StateStore::new(workspace.root.join("state/panacea_state.json"));

    store
        .record_run(
            "run-1",
            "2026-01-01T00:00:00Z",
            &[
                ("a.txt".to_string(), "d1".to_string()),
                ("b.txt".to_string(), "d2".to_string()),
            ],
        )
        .expect("first run");
    let state = store
        .record_run(
            "run-2",
            "2026-01-02T00:00:00Z",
            &[("a.txt".to_string(), "d3".to_string())],
        )
        .expect("second run");

    assert_eq!(state.cycles_completed, 2);
    assert_eq!(state.files_processed, 3);
    assert_eq!(state.last_run_id.as_deref(), Some("run-2"));
    assert_eq!(state.file_digests["a.txt"], "d3");
    assert_eq!(state.file_digests["b.txt"], "d2");
    assert_eq!(store.load().expect("load").expect("present"), state);
    assert!(!store.path().with_extension("tmp").exists());
}

#[test]
fn given_manual_processing_toggle_when_saved_then_counters_survive() {
    let workspace = Workspace::new("state-manual");
    let store = StateStore::new(workspace.root.join("state.json"));
    store
        .record_run("run-1", "2026-01-01T00:00:00Z", &[])
        .expect("run");

    let state = store.set_manual_processing(true).expect("toggle");
    assert!(state.manual_processing);
    assert_eq!(state.cycles_completed, 1);
}

#[test]
fn given_future_state_version_when_load_then_it_is_rejected() {
    let workspace = Workspace::new("state-version");
    let path = workspace.write(
        "state.json",
        r#"{ "version": 99, "state": { "files_processed": 1 } }"#,
    );

    let err = StateStore::new(path).load().expect_err("version 99 must fail");
    assert!(matches!(
        err,
        CorpusError::UnsupportedStateVersion { version: 99, .. }
    ));
}

#[test]
fn given_corrupt_state_when_load_then_serialization_error_is_returned() {
    let workspace = Workspace::new("state-corrupt");
    let path = workspace.write("state.json", "{ not json");

    let err = StateStore::new(path.clone()).load().expect_err("corrupt must fail");
    assert!(matches!(err, CorpusError::Serialization { .. }));
    assert!(fs::read_to_string(path).is_ok());
}

#[test]
fn given_blank_run_id_when_record_run_then_it_is_rejected() {
    let workspace = Workspace::new("state-blank");
    let store = StateStore::new(workspace.root.join("state.json"));
    assert!(store.record_run(" ", "now", &[]).is_err());
    assert!(store.load().expect("load").is_none());
}
