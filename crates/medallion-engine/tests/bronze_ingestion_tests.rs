//! Bronze ingestion: incremental skipping, all-or-nothing state, manifests

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{Workspace, RAGGED};
use medallion_core::manifest::{BronzeManifest, ItemStatus, RunStatus};
use medallion_core::render::HtmlReportRenderer;
use medallion_core::ExErrorKind;
use medallion_engine::stages::bronze::SKIP_UNCHANGED;
use medallion_engine::stages::run_bronze;
use medallion_store::layout::{state_path, RunLayout};
use medallion_store::manifest_io::read_yaml;
use medallion_store::reports::BRONZE_REPORT_FILE;
use medallion_store::IngestionState;
use std::fs;

#[test]
fn test_first_run_ingests_every_file() {
    // Given: six raw extracts and no prior state
    let ws = Workspace::full();

    // When
    let outcome = run_bronze(&ws.cfg, &HtmlReportRenderer).unwrap();

    // Then: all copied byte-for-byte, state written, artifacts present
    assert_eq!(outcome.status, RunStatus::Success);
    assert_eq!(outcome.exit_code(), 0);
    assert!(!outcome.no_new_data);

    let manifest: BronzeManifest = read_yaml(&outcome.manifest_path).unwrap();
    assert_eq!(manifest.summary.files_total, 6);
    assert_eq!(manifest.summary.files_success, 6);
    assert!(manifest.summary.has_new_data);
    assert!(manifest.summary.state_updated);
    assert_eq!(manifest.summary.rows_total, 12);

    let layout = RunLayout::new(&ws.cfg.bronze_root, &outcome.run_id);
    let copied = fs::read(layout.data_file("cst_info.csv")).unwrap();
    assert_eq!(copied, common::CST_INFO.as_bytes());
    assert!(layout.report_path(BRONZE_REPORT_FILE).is_file());

    let log = fs::read_to_string(layout.run_log_path()).unwrap();
    assert!(log.contains("RUN_START"));
    assert!(log.contains("RUN_END"));

    let state = IngestionState::load(&state_path(&ws.cfg.bronze_root)).unwrap();
    assert_eq!(state.files.len(), 6);
}

#[test]
fn test_second_run_skips_unchanged_files() {
    // Given: a completed first run
    let ws = Workspace::full();
    run_bronze(&ws.cfg, &HtmlReportRenderer).unwrap();
    let state_file = state_path(&ws.cfg.bronze_root);
    let before = IngestionState::load(&state_file).unwrap();

    // When: nothing changed
    let outcome = run_bronze(&ws.cfg, &HtmlReportRenderer).unwrap();

    // Then: every file skipped, nothing copied, fingerprints unchanged
    assert_eq!(outcome.status, RunStatus::Success);
    assert!(outcome.no_new_data);

    let manifest: BronzeManifest = read_yaml(&outcome.manifest_path).unwrap();
    assert_eq!(manifest.summary.files_success, 0);
    assert_eq!(manifest.summary.files_skipped, 6);
    assert!(!manifest.summary.has_new_data);
    assert!(manifest
        .files
        .iter()
        .all(|f| f.status == ItemStatus::Skipped
            && f.skip_reason.as_deref() == Some(SKIP_UNCHANGED)));

    let data_dir = RunLayout::new(&ws.cfg.bronze_root, &outcome.run_id).data_dir();
    assert_eq!(common::csv_files(&data_dir).len(), 0);

    let after = IngestionState::load(&state_file).unwrap();
    for (path, entry) in &before.files {
        let now = after.get(path).unwrap();
        assert_eq!(now.sha256, entry.sha256);
        assert_eq!(now.size_bytes, entry.size_bytes);
    }
}

#[test]
fn test_changed_file_is_reingested() {
    // Given
    let ws = Workspace::full();
    run_bronze(&ws.cfg, &HtmlReportRenderer).unwrap();

    // When: one extract gains a row
    let mut body = common::LOC_A101.to_string();
    body.push_str("AW-00011002,France\n");
    ws.write_erp("LOC_A101.csv", &body);
    let outcome = run_bronze(&ws.cfg, &HtmlReportRenderer).unwrap();

    // Then
    let manifest: BronzeManifest = read_yaml(&outcome.manifest_path).unwrap();
    assert_eq!(manifest.summary.files_success, 1);
    assert_eq!(manifest.summary.files_skipped, 5);
    let loc = manifest.files.iter().find(|f| f.file == "LOC_A101.csv").unwrap();
    assert!(loc.is_changed);
    assert_eq!(loc.rows, Some(3));
}

#[test]
fn test_failure_leaves_previous_state_untouched() {
    // Given: three files ingested once
    let ws = Workspace::empty();
    ws.write_crm("cst_info.csv", common::CST_INFO);
    ws.write_crm("prd_info.csv", common::PRD_INFO);
    ws.write_erp("LOC_A101.csv", common::LOC_A101);
    run_bronze(&ws.cfg, &HtmlReportRenderer).unwrap();
    let state_file = state_path(&ws.cfg.bronze_root);
    let before = fs::read_to_string(&state_file).unwrap();

    // When: one file changes and another becomes unparseable
    let grown = format!(
        "{}11002,AW00011002,Cara,Diaz,M,F,2025-10-08\n",
        common::CST_INFO
    );
    ws.write_crm("cst_info.csv", &grown);
    ws.write_crm("prd_info.csv", RAGGED);
    let outcome = run_bronze(&ws.cfg, &HtmlReportRenderer).unwrap();

    // Then: partial run, the state document is byte-identical
    assert_eq!(outcome.status, RunStatus::Partial);
    assert_eq!(outcome.exit_code(), 2);
    assert_eq!(outcome.errors, 1);

    let manifest: BronzeManifest = read_yaml(&outcome.manifest_path).unwrap();
    assert_eq!(manifest.summary.files_success, 1);
    assert_eq!(manifest.summary.files_skipped, 1);
    assert_eq!(manifest.summary.files_failed, 1);
    assert!(!manifest.summary.state_updated);
    assert_eq!(manifest.errors.len(), 1);
    assert_eq!(manifest.errors[0].item, "prd_info.csv");
    assert_eq!(manifest.errors[0].error_type, "ERR_PARSE");

    assert_eq!(fs::read_to_string(&state_file).unwrap(), before);
}

#[test]
fn test_declared_missing_file_is_recorded_as_failure() {
    // Given: a declared file that does not exist on disk
    let mut ws = Workspace::full();
    ws.cfg.erp.files = vec!["ERP_EXTRA.csv".to_string()];

    // When
    let outcome = run_bronze(&ws.cfg, &HtmlReportRenderer).unwrap();

    // Then: the run goes on and the state is not written
    assert_eq!(outcome.status, RunStatus::Partial);
    let manifest: BronzeManifest = read_yaml(&outcome.manifest_path).unwrap();
    assert_eq!(manifest.summary.files_total, 7);
    assert_eq!(manifest.summary.files_success, 6);
    assert_eq!(manifest.summary.files_failed, 1);
    assert!(!state_path(&ws.cfg.bronze_root).exists());
}

#[test]
fn test_exclude_glob_filters_discovery() {
    // Given
    let mut ws = Workspace::full();
    ws.write_crm("scratch_notes.csv", "x\n1\n");
    ws.cfg.crm.exclude_glob = Some("scratch_*".to_string());

    // When
    let outcome = run_bronze(&ws.cfg, &HtmlReportRenderer).unwrap();

    // Then
    let manifest: BronzeManifest = read_yaml(&outcome.manifest_path).unwrap();
    assert_eq!(manifest.summary.files_total, 6);
    assert!(manifest.files.iter().all(|f| f.file != "scratch_notes.csv"));
}

#[test]
fn test_same_file_name_in_both_sources_is_not_overwritten() {
    // Given: CRM and ERP each ship a customers.csv
    let ws = Workspace::empty();
    ws.write_crm("customers.csv", "id\n1\n");
    ws.write_erp("customers.csv", "id\n2\n3\n");

    // When
    let outcome = run_bronze(&ws.cfg, &HtmlReportRenderer).unwrap();

    // Then: CRM keeps the name, ERP is recorded as a failure
    assert_eq!(outcome.status, RunStatus::Partial);
    let manifest: BronzeManifest = read_yaml(&outcome.manifest_path).unwrap();
    assert_eq!(manifest.summary.files_success, 1);
    assert_eq!(manifest.summary.files_failed, 1);

    let crm = manifest.files.iter().find(|f| f.source_system == "CRM").unwrap();
    assert_eq!(crm.status, ItemStatus::Success);
    let erp = manifest.files.iter().find(|f| f.source_system == "ERP").unwrap();
    assert_eq!(erp.status, ItemStatus::Failed);
    assert_eq!(erp.error_type.as_deref(), Some("ERR_ALREADY_EXISTS"));
    assert!(erp.output_path.is_none());
    assert_eq!(manifest.errors[0].item, "customers.csv");

    let layout = RunLayout::new(&ws.cfg.bronze_root, &outcome.run_id);
    let copied = fs::read_to_string(layout.data_file("customers.csv")).unwrap();
    assert_eq!(copied, "id\n1\n");
    assert!(!state_path(&ws.cfg.bronze_root).exists());
}

#[test]
fn test_missing_source_root_is_fatal_and_creates_nothing() {
    // Given
    let ws = Workspace::full();
    fs::remove_dir_all(&ws.cfg.erp.root).unwrap();

    // When
    let err = run_bronze(&ws.cfg, &HtmlReportRenderer).unwrap_err();

    // Then
    assert_eq!(err.kind(), ExErrorKind::Config);
    assert_eq!(err.item(), Some("ERP"));
    assert!(common::subdirs(&ws.cfg.bronze_root).is_empty());
}

#[test]
fn test_empty_sources_are_not_no_new_data() {
    // Given: roots exist but hold nothing
    let ws = Workspace::empty();

    // When
    let outcome = run_bronze(&ws.cfg, &HtmlReportRenderer).unwrap();

    // Then
    assert_eq!(outcome.status, RunStatus::Success);
    assert!(!outcome.no_new_data);
    let manifest: BronzeManifest = read_yaml(&outcome.manifest_path).unwrap();
    assert_eq!(manifest.summary.files_total, 0);
    assert!(!manifest.summary.has_new_data);
}
