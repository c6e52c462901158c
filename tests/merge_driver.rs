//! Git merge driver contract: write ours on success, log on failure.

mod common;

use common::fixtures::{EntityBuilder, JAN_01, JAN_02, JAN_03, entity, write_jsonl};
use docket::jsonl;
use docket::resolve::{FAILURE_MARKER, MergeDriverRequest, merge_driver, run_merge_driver};
use std::fs;
use tempfile::TempDir;

fn scenario(dir: &TempDir) -> MergeDriverRequest {
    let base = vec![entity("ISSUE-001", "uuid-1")];
    let ours = vec![
        EntityBuilder::new("ISSUE-001", "uuid-1")
            .title("Ours")
            .updated(JAN_02)
            .build(),
        EntityBuilder::new("ISSUE-002", "uuid-2")
            .created(JAN_02)
            .build(),
    ];
    let theirs = vec![
        EntityBuilder::new("ISSUE-001", "uuid-1")
            .title("Theirs")
            .updated(JAN_03)
            .build(),
        EntityBuilder::new("ISSUE-002", "uuid-3")
            .created(JAN_03)
            .build(),
    ];
    MergeDriverRequest::new(
        write_jsonl(dir.path(), "base.jsonl", &base),
        write_jsonl(dir.path(), "ours.jsonl", &ours),
        write_jsonl(dir.path(), "theirs.jsonl", &theirs),
    )
}

#[test]
fn driver_overwrites_ours_and_writes_no_log() {
    let _log = common::test_log("driver_overwrites_ours_and_writes_no_log");
    let dir = TempDir::new().expect("temp dir");
    let request = scenario(&dir);
    let log_path = dir.path().join("logs").join("merge-driver.log");

    let outcome = run_merge_driver(&request, &log_path).expect("driver succeeds");

    assert!(outcome.written);
    assert_eq!(outcome.entity_count, 3);
    assert!(!log_path.exists());

    let merged = jsonl::read_entities(&request.ours).expect("read merged");
    assert!(merged.skipped.is_empty());
    let summary: Vec<(&str, &str)> = merged
        .entities
        .iter()
        .map(|e| (e.id.as_str(), e.uuid.as_str()))
        .collect();
    assert_eq!(
        summary,
        [
            ("ISSUE-001", "uuid-1"),
            ("ISSUE-002", "uuid-2"),
            ("ISSUE-002.1", "uuid-3"),
        ]
    );
    assert_eq!(merged.entities[0].title.as_deref(), Some("Theirs"));
    assert!(!jsonl::temp_path_for(&request.ours).exists());
}

#[test]
fn driver_skips_write_when_ours_already_merged() {
    let _log = common::test_log("driver_skips_write_when_ours_already_merged");
    let dir = TempDir::new().expect("temp dir");
    let records = vec![
        entity("ISSUE-001", "uuid-1"),
        EntityBuilder::new("ISSUE-002", "uuid-2")
            .created(JAN_02)
            .build(),
    ];
    let request = MergeDriverRequest::new(
        write_jsonl(dir.path(), "base.jsonl", &records[..1]),
        write_jsonl(dir.path(), "ours.jsonl", &records),
        write_jsonl(dir.path(), "theirs.jsonl", &records[..1]),
    );
    let before = fs::read_to_string(&request.ours).expect("read ours");

    let outcome = merge_driver(&request).expect("driver succeeds");

    assert!(!outcome.written);
    assert_eq!(fs::read_to_string(&request.ours).expect("read ours"), before);
}

#[test]
fn driver_merges_without_ancestor_file() {
    let _log = common::test_log("driver_merges_without_ancestor_file");
    let dir = TempDir::new().expect("temp dir");
    let mut request = scenario(&dir);
    request.base = dir.path().join("missing-base.jsonl");

    let outcome = merge_driver(&request).expect("driver succeeds");

    assert_eq!(outcome.entity_count, 3);
    assert_eq!(outcome.stats.reconciled, 1);
}

#[test]
fn driver_keeps_unknown_fields_byte_for_byte() {
    let _log = common::test_log("driver_keeps_unknown_fields_byte_for_byte");
    let dir = TempDir::new().expect("temp dir");
    let line = r#"{"id":"ISSUE-001","uuid":"uuid-1","title":"Same","created_at":"2025-01-01T00:00:00.000Z","updated_at":"2025-01-01T00:00:00.000Z","custom":{"nested":[1,2,3]}}"#;
    let base = dir.path().join("base.jsonl");
    let ours = dir.path().join("ours.jsonl");
    let theirs = dir.path().join("theirs.jsonl");
    fs::write(&base, format!("{line}\n")).expect("write base");
    fs::write(&ours, format!("{line}\n")).expect("write ours");
    let added = EntityBuilder::new("ISSUE-002", "uuid-2")
        .created(JAN_02)
        .build();
    fs::write(
        &theirs,
        format!("{line}\n{}", common::fixtures::jsonl_text(&[added])),
    )
    .expect("write theirs");

    let outcome = merge_driver(&MergeDriverRequest::new(&base, &ours, &theirs)).expect("merge");

    assert!(outcome.written);
    let text = fs::read_to_string(&ours).expect("read merged");
    assert_eq!(text.lines().next(), Some(line));
    assert_eq!(text.lines().count(), 2);
}

#[test]
fn driver_failure_is_logged_with_path_and_error() {
    let _log = common::test_log("driver_failure_is_logged_with_path_and_error");
    let dir = TempDir::new().expect("temp dir");
    let mut request = scenario(&dir);
    request.display_path = Some(".docket/issues.jsonl".to_string());
    let original = fs::read_to_string(&request.ours).expect("read ours");

    // A directory squatting on the temp path makes the atomic write fail.
    fs::create_dir_all(jsonl::temp_path_for(&request.ours)).expect("block temp path");
    let log_path = dir.path().join("merge-driver.log");

    let err = run_merge_driver(&request, &log_path).expect_err("driver fails");

    let log = fs::read_to_string(&log_path).expect("failure log written");
    assert!(log.contains(FAILURE_MARKER));
    assert!(log.contains("path: .docket/issues.jsonl"));
    assert!(log.contains(&format!("error: {err}")));
    assert_eq!(
        fs::read_to_string(&request.ours).expect("read ours"),
        original
    );
}

#[test]
fn driver_failure_on_missing_ours_is_logged() {
    let _log = common::test_log("driver_failure_on_missing_ours_is_logged");
    let dir = TempDir::new().expect("temp dir");
    let mut request = scenario(&dir);
    request.ours = dir.path().join("nope").join("ours.jsonl");
    let log_path = dir.path().join("merge-driver.log");

    assert!(run_merge_driver(&request, &log_path).is_err());
    assert!(run_merge_driver(&request, &log_path).is_err());

    let log = fs::read_to_string(&log_path).expect("failure log written");
    assert_eq!(log.matches(FAILURE_MARKER).count(), 2);
    assert!(log.contains("ours.jsonl"));
}

#[test]
fn driver_timestamps_are_preserved_as_written() {
    let _log = common::test_log("driver_timestamps_are_preserved_as_written");
    let dir = TempDir::new().expect("temp dir");
    let request = scenario(&dir);

    merge_driver(&request).expect("driver succeeds");

    let merged = jsonl::read_entities(&request.ours).expect("read merged");
    assert_eq!(
        merged.entities[0].created_at.as_ref().map(|t| t.as_str()),
        Some(JAN_01)
    );
}
