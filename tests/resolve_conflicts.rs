//! Resolving files that git left with conflict markers.

mod common;

use common::fixtures::{
    EntityBuilder, JAN_02, JAN_03, JAN_04, conflicted_text, entity, ids, jsonl_text, uuids,
};
use docket::jsonl;
use docket::resolve::{
    self, MergeSource, ResolveOptions, ResolveStatus, check_files, markers_error,
    resolve_conflicts,
};
use docket::{ConflictAction, DocketError};
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn markers_only() -> ResolveOptions {
    ResolveOptions {
        use_git_stages: false,
        ..ResolveOptions::default()
    }
}

#[test]
fn resolves_two_way_markers_in_place() {
    let _log = common::test_log("resolves_two_way_markers_in_place");
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("issues.jsonl");
    let shared = entity("ISSUE-001", "uuid-1");
    let ours = EntityBuilder::new("ISSUE-002", "uuid-2")
        .created(JAN_02)
        .build();
    let theirs = EntityBuilder::new("ISSUE-002", "uuid-3")
        .created(JAN_03)
        .build();
    fs::write(&path, conflicted_text(&[shared], &[ours], None, &[theirs])).expect("write");

    let outcome = resolve_conflicts(&path, &markers_only()).expect("resolve");

    assert_eq!(outcome.status, ResolveStatus::Resolved);
    assert_eq!(outcome.source, Some(MergeSource::ConflictMarkers));
    assert_eq!(outcome.regions, 1);
    assert!(outcome.written);

    let text = fs::read_to_string(&path).expect("read resolved");
    assert!(!jsonl::has_conflict_markers(&text));
    let merged = jsonl::decode_str(&text, "resolved");
    assert_eq!(uuids(&merged.entities), ["uuid-1", "uuid-2", "uuid-3"]);
    assert_eq!(ids(&merged.entities), ["ISSUE-001", "ISSUE-002", "ISSUE-002.1"]);
}

#[test]
fn same_record_edited_on_both_sides_is_reconciled() {
    let _log = common::test_log("same_record_edited_on_both_sides_is_reconciled");
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("issues.jsonl");
    let ours = EntityBuilder::new("ISSUE-001", "uuid-1")
        .title("Ours")
        .tags(&["a"])
        .updated(JAN_04)
        .build();
    let theirs = EntityBuilder::new("ISSUE-001", "uuid-1")
        .title("Theirs")
        .tags(&["b"])
        .updated(JAN_02)
        .build();
    fs::write(&path, conflicted_text(&[], &[ours], None, &[theirs])).expect("write");

    let outcome = resolve_conflicts(&path, &markers_only()).expect("resolve");

    assert_eq!(outcome.entity_count, 1);
    let merged = jsonl::read_entities(&path).expect("read").entities;
    assert_eq!(merged[0].title.as_deref(), Some("Ours"));
    assert_eq!(merged[0].tag_list(), ["a", "b"]);
    assert_eq!(
        outcome.stats.conflicts[0].action,
        ConflictAction::ConcurrentAddition
    );
}

#[test]
fn diff3_base_section_detects_deletion() {
    let _log = common::test_log("diff3_base_section_detects_deletion");
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("issues.jsonl");
    let kept = entity("ISSUE-001", "uuid-1");
    let removed = EntityBuilder::new("ISSUE-002", "uuid-2")
        .created(JAN_02)
        .build();
    let added = EntityBuilder::new("ISSUE-003", "uuid-3")
        .created(JAN_03)
        .build();
    // Ours deleted ISSUE-002; theirs left it alone and added ISSUE-003.
    let text = conflicted_text(
        &[kept],
        &[],
        Some(std::slice::from_ref(&removed)),
        &[removed.clone(), added],
    );
    fs::write(&path, text).expect("write");

    let outcome = resolve_conflicts(&path, &markers_only()).expect("resolve");

    let merged = jsonl::read_entities(&path).expect("read").entities;
    assert_eq!(uuids(&merged), ["uuid-1", "uuid-3"]);
    assert_eq!(outcome.stats.deleted, 1);
    assert_eq!(outcome.stats.added, 1);
}

#[test]
fn dry_run_reports_without_writing() {
    let _log = common::test_log("dry_run_reports_without_writing");
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("issues.jsonl");
    let text = conflicted_text(
        &[],
        &[entity("A", "uuid-a")],
        None,
        &[entity("B", "uuid-b")],
    );
    fs::write(&path, &text).expect("write");

    let options = ResolveOptions {
        dry_run: true,
        ..markers_only()
    };
    let outcome = resolve_conflicts(&path, &options).expect("resolve");

    assert_eq!(outcome.status, ResolveStatus::Resolved);
    assert!(outcome.dry_run);
    assert!(!outcome.written);
    assert_eq!(outcome.entity_count, 2);
    assert!(outcome.content_hash.is_some());
    assert_eq!(fs::read_to_string(&path).expect("read"), text);
}

#[test]
fn clean_file_is_left_alone() {
    let _log = common::test_log("clean_file_is_left_alone");
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("issues.jsonl");
    let text = jsonl_text(&[entity("A", "uuid-a")]);
    fs::write(&path, &text).expect("write");

    let outcome = resolve_conflicts(&path, &ResolveOptions::default()).expect("resolve");

    assert_eq!(outcome.status, ResolveStatus::NoConflicts);
    assert!(!outcome.written);
    assert_eq!(fs::read_to_string(&path).expect("read"), text);
}

#[test]
fn malformed_lines_inside_regions_are_reported() {
    let _log = common::test_log("malformed_lines_inside_regions_are_reported");
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("issues.jsonl");
    let mut text = String::from("<<<<<<< HEAD\n");
    text.push_str(&jsonl_text(&[entity("A", "uuid-a")]));
    text.push_str("{broken\n=======\n");
    text.push_str(&jsonl_text(&[entity("B", "uuid-b")]));
    text.push_str(">>>>>>> feature\n");
    fs::write(&path, text).expect("write");

    let outcome = resolve_conflicts(&path, &markers_only()).expect("resolve");

    assert_eq!(outcome.entity_count, 2);
    assert_eq!(outcome.skipped_lines.len(), 1);
}

#[test]
fn resolve_all_reports_only_conflicted_files() {
    let _log = common::test_log("resolve_all_reports_only_conflicted_files");
    let dir = TempDir::new().expect("temp dir");
    fs::write(
        dir.path().join("clean.jsonl"),
        jsonl_text(&[entity("A", "uuid-a")]),
    )
    .expect("write clean");
    fs::write(
        dir.path().join("specs.jsonl"),
        conflicted_text(&[], &[entity("S-1", "s-1")], None, &[entity("S-2", "s-2")]),
    )
    .expect("write conflicted");
    fs::write(dir.path().join("notes.txt"), "<<<<<<< HEAD\n").expect("write other");

    let outcomes = resolve::resolve_all(dir.path(), &markers_only()).expect("resolve all");

    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].path.ends_with("specs.jsonl"));
    assert!(check_files(&resolve::jsonl_files(dir.path()).expect("list")).expect("check").is_empty());
}

#[test]
fn check_reports_markers_as_error() {
    let _log = common::test_log("check_reports_markers_as_error");
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("issues.jsonl");
    fs::write(
        &path,
        conflicted_text(&[], &[entity("A", "uuid-a")], None, &[entity("B", "uuid-b")]),
    )
    .expect("write");

    let found = check_files(std::slice::from_ref(&path)).expect("check");

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].markers.len(), 3);
    match markers_error(&found) {
        Some(DocketError::ConflictMarkers { path: p, count }) => {
            assert_eq!(p, path);
            assert_eq!(count, 3);
        }
        other => panic!("unexpected: {other:?}"),
    }
}

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .is_ok_and(|out| out.status.success())
}

fn git(dir: &Path, args: &[&str]) -> std::process::Output {
    Command::new("git")
        .current_dir(dir)
        .args([
            "-c",
            "user.name=Docket Test",
            "-c",
            "user.email=test@example.com",
            "-c",
            "commit.gpgsign=false",
        ])
        .args(args)
        .output()
        .expect("run git")
}

#[test]
fn prefers_git_stages_over_markers() {
    let _log = common::test_log("prefers_git_stages_over_markers");
    if !git_available() {
        eprintln!("git not available; skipping");
        return;
    }
    let dir = TempDir::new().expect("temp dir");
    let root = dir.path();
    let data = root.join(".docket");
    fs::create_dir_all(&data).expect("data dir");
    let path = data.join("issues.jsonl");

    assert!(git(root, &["init", "-q"]).status.success());
    let base = entity("ISSUE-001", "uuid-1");
    fs::write(&path, jsonl_text(std::slice::from_ref(&base))).expect("write base");
    git(root, &["add", "."]);
    assert!(git(root, &["commit", "-q", "-m", "base"]).status.success());
    let head = git(root, &["rev-parse", "--abbrev-ref", "HEAD"]);
    let main = String::from_utf8_lossy(&head.stdout).trim().to_string();

    git(root, &["checkout", "-q", "-b", "feature"]);
    let theirs = EntityBuilder::new("ISSUE-001", "uuid-1")
        .title("Theirs")
        .updated(JAN_03)
        .build();
    fs::write(&path, jsonl_text(&[theirs])).expect("write theirs");
    git(root, &["commit", "-q", "-am", "theirs"]);

    git(root, &["checkout", "-q", &main]);
    let ours = EntityBuilder::new("ISSUE-001", "uuid-1")
        .title("Ours")
        .updated(JAN_02)
        .build();
    fs::write(&path, jsonl_text(&[ours])).expect("write ours");
    git(root, &["commit", "-q", "-am", "ours"]);

    let merge = git(root, &["merge", "-q", "feature"]);
    assert!(!merge.status.success(), "expected a conflict");

    let outcome = resolve_conflicts(&path, &ResolveOptions::default()).expect("resolve");

    assert_eq!(outcome.source, Some(MergeSource::GitStages));
    let merged = jsonl::read_entities(&path).expect("read").entities;
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].title.as_deref(), Some("Theirs"));
    assert_eq!(outcome.stats.reconciled, 1);
}
