//! Change detection across runs: fingerprints, state documents, run layout

#![allow(clippy::unwrap_used, clippy::expect_used)]

use medallion_core::ExErrorKind;
use medallion_store::layout::{latest_run_id, state_path, RunLayout};
use medallion_store::state::StateEntry;
use medallion_store::{FileFingerprint, IngestionState};
use std::fs;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

fn saved_state(bronze_root: &std::path::Path, source: &std::path::Path) -> IngestionState {
    let fp = FileFingerprint::of(source).unwrap();
    let mut state = IngestionState::default();
    state.files.insert(
        source.display().to_string(),
        StateEntry::new("CRM", &fp),
    );
    state.save(&state_path(bronze_root)).unwrap();
    IngestionState::load(&state_path(bronze_root)).unwrap()
}

#[test]
fn test_unchanged_file_is_not_changed_after_reload() {
    // Given: a state document written for one file
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("cst_info.csv");
    fs::write(&source, "cst_id\n1\n").unwrap();
    let state = saved_state(&dir.path().join("bronze"), &source);

    // When / Then
    let now = FileFingerprint::of(&source).unwrap();
    assert!(!state.is_changed(&source.display().to_string(), &now));
}

#[test]
fn test_content_change_is_detected() {
    // Given
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("cst_info.csv");
    fs::write(&source, "cst_id\n1\n").unwrap();
    let state = saved_state(&dir.path().join("bronze"), &source);

    // When: same size, different bytes
    fs::write(&source, "cst_id\n2\n").unwrap();

    // Then
    let now = FileFingerprint::of(&source).unwrap();
    assert!(state.is_changed(&source.display().to_string(), &now));
}

#[test]
fn test_touch_alone_is_detected() {
    // Given
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("LOC_A101.csv");
    fs::write(&source, "CID,CNTRY\n").unwrap();
    let state = saved_state(&dir.path().join("bronze"), &source);

    // When: only the modification time moves
    let later = SystemTime::now() + Duration::from_secs(120);
    fs::File::options()
        .write(true)
        .open(&source)
        .unwrap()
        .set_modified(later)
        .unwrap();

    // Then
    let now = FileFingerprint::of(&source).unwrap();
    let prev = state.get(&source.display().to_string()).unwrap();
    assert_eq!(prev.sha256, now.sha256);
    assert!(state.is_changed(&source.display().to_string(), &now));
}

#[test]
fn test_unknown_file_counts_as_changed() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("new.csv");
    fs::write(&source, "a\n").unwrap();

    let state = IngestionState::load(&state_path(&dir.path().join("bronze"))).unwrap();

    assert!(state.files.is_empty());
    assert!(state.is_changed(
        &source.display().to_string(),
        &FileFingerprint::of(&source).unwrap()
    ));
}

#[test]
fn test_state_dir_never_shadows_latest_run() {
    // Given: two runs and the state directory under one layer root
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("bronze");
    RunLayout::new(&root, "20240102_030405_#abcdef12").create().unwrap();
    RunLayout::new(&root, "20240103_000000_#99887766").create().unwrap();
    IngestionState::default().save(&state_path(&root)).unwrap();

    // When / Then
    assert_eq!(latest_run_id(&root).unwrap(), "20240103_000000_#99887766");
}

#[test]
fn test_latest_run_on_missing_root_is_not_found() {
    let dir = TempDir::new().unwrap();
    let err = latest_run_id(&dir.path().join("silver")).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotFound);
}
