//! Silver transforms and Gold mart builds over real Bronze runs

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::Workspace;
use medallion_core::gold::{MartKind, MartPlan};
use medallion_core::manifest::{GoldManifest, ItemStatus, RunStatus, SilverManifest};
use medallion_core::render::HtmlReportRenderer;
use medallion_core::run_id::RunId;
use medallion_core::ExErrorKind;
use medallion_engine::stages::gold::{SKIP_DISABLED, SKIP_SOURCE_ABSENT};
use medallion_engine::stages::{run_bronze, run_gold, run_silver, GoldRequest};
use medallion_store::csv_io::read_table;
use medallion_store::layout::RunLayout;
use medallion_store::manifest_io::read_yaml;
use medallion_store::reports::{GOLD_REPORT_FILE, SILVER_REPORT_FILE};
use std::fs;

#[test]
fn test_silver_keeps_parent_suffix_and_cleans_text() {
    // Given
    let ws = Workspace::full();
    let bronze = run_bronze(&ws.cfg, &HtmlReportRenderer).unwrap();

    // When
    let silver = run_silver(&ws.cfg, Some(bronze.run_id.as_str()), &HtmlReportRenderer).unwrap();

    // Then: lineage suffix carried, values trimmed, row counts preserved
    assert_eq!(silver.status, RunStatus::Success);
    assert_eq!(silver.parent_run_id.as_deref(), Some(bronze.run_id.as_str()));
    let parent = RunId::parse(&bronze.run_id).unwrap();
    let child = RunId::parse(&silver.run_id).unwrap();
    assert_eq!(child.suffix(), parent.suffix());

    let layout = RunLayout::new(&ws.cfg.silver_root, &silver.run_id);
    let customers = read_table(&layout.data_file("cst_info.csv")).unwrap();
    assert_eq!(customers.len(), 2);
    assert_eq!(customers.value(0, "cst_firstname"), Some("Alice"));
    assert_eq!(customers.value(1, "cst_lastname"), Some("Jones"));

    let manifest: SilverManifest = read_yaml(&silver.manifest_path).unwrap();
    assert_eq!(manifest.summary.tables_total, 6);
    assert_eq!(manifest.summary.rows_in, manifest.summary.rows_out);
    assert!(manifest.source.bronze_manifest_found);
    assert!(manifest.tables.iter().all(|t| t.rows_in == t.rows_out));
    assert!(layout.report_path(SILVER_REPORT_FILE).is_file());
}

#[test]
fn test_silver_defaults_to_latest_bronze_run() {
    // Given
    let ws = Workspace::full();
    let bronze = run_bronze(&ws.cfg, &HtmlReportRenderer).unwrap();

    // When
    let silver = run_silver(&ws.cfg, None, &HtmlReportRenderer).unwrap();

    // Then
    assert_eq!(silver.parent_run_id, Some(bronze.run_id));
}

#[test]
fn test_silver_records_unreadable_table_and_continues() {
    // Given: a Bronze run whose data holds one broken extract
    let ws = Workspace::full();
    let bronze = run_bronze(&ws.cfg, &HtmlReportRenderer).unwrap();
    let bronze_data = RunLayout::new(&ws.cfg.bronze_root, &bronze.run_id).data_dir();
    fs::write(bronze_data.join("broken.csv"), common::RAGGED).unwrap();

    // When
    let silver = run_silver(&ws.cfg, Some(bronze.run_id.as_str()), &HtmlReportRenderer).unwrap();

    // Then
    assert_eq!(silver.status, RunStatus::Partial);
    assert_eq!(silver.exit_code(), 2);
    let manifest: SilverManifest = read_yaml(&silver.manifest_path).unwrap();
    assert_eq!(manifest.summary.tables_success, 6);
    assert_eq!(manifest.summary.tables_failed, 1);
    let broken = manifest.tables.iter().find(|t| t.table == "broken").unwrap();
    assert_eq!(broken.status, ItemStatus::Failed);
    assert_eq!(manifest.errors.len(), 1);
}

#[test]
fn test_silver_rejects_invalid_parent_without_artifacts() {
    // Given
    let ws = Workspace::full();

    // When
    let err = run_silver(&ws.cfg, Some("../escape"), &HtmlReportRenderer).unwrap_err();

    // Then
    assert_eq!(err.kind(), ExErrorKind::InvalidRunId);
    assert!(common::subdirs(&ws.cfg.silver_root).is_empty());
}

#[test]
fn test_silver_missing_parent_data_is_fatal() {
    // Given: a well-formed id with no run behind it
    let ws = Workspace::full();

    // When
    let err = run_silver(&ws.cfg, Some("20240101_000000_#abcdef12"), &HtmlReportRenderer)
        .unwrap_err();

    // Then
    assert_eq!(err.kind(), ExErrorKind::NotFound);
    assert!(common::subdirs(&ws.cfg.silver_root).is_empty());
}

#[test]
fn test_gold_builds_full_catalog() {
    // Given
    let ws = Workspace::full();
    let bronze = run_bronze(&ws.cfg, &HtmlReportRenderer).unwrap();
    let silver = run_silver(&ws.cfg, Some(bronze.run_id.as_str()), &HtmlReportRenderer).unwrap();

    // When
    let request = GoldRequest {
        parent_run_id: Some(silver.run_id.clone()),
        plan: MartPlan::all(),
    };
    let gold = run_gold(&ws.cfg, &request, &HtmlReportRenderer).unwrap();

    // Then
    assert_eq!(gold.status, RunStatus::Success);
    assert!(gold.run_dir.starts_with(ws.cfg.gold_marts_root()));
    let manifest: GoldManifest = read_yaml(&gold.manifest_path).unwrap();
    assert_eq!(manifest.metrics.marts_built, MartKind::ALL.len());
    assert!(manifest.errors.is_empty());
    assert_eq!(manifest.source.silver_run_id, silver.run_id);

    let layout = RunLayout::new(&ws.cfg.gold_marts_root(), &gold.run_id);
    let fact = read_table(&layout.data_file(&MartKind::FactSales.output_file_name())).unwrap();
    assert_eq!(fact.len(), 2);
    assert!(layout.report_path(GOLD_REPORT_FILE).is_file());
}

#[test]
fn test_gold_isolates_failures_when_location_is_absent() {
    // Given: no location extract anywhere upstream
    let ws = Workspace::without_location();
    let bronze = run_bronze(&ws.cfg, &HtmlReportRenderer).unwrap();
    let silver = run_silver(&ws.cfg, Some(bronze.run_id.as_str()), &HtmlReportRenderer).unwrap();

    // When
    let request = GoldRequest {
        parent_run_id: Some(silver.run_id),
        plan: MartPlan::all(),
    };
    let gold = run_gold(&ws.cfg, &request, &HtmlReportRenderer).unwrap();

    // Then: dim_location skipped, its two dependents fail, the rest build
    assert_eq!(gold.status, RunStatus::Partial);
    assert_eq!(gold.exit_code(), 2);
    assert_eq!(gold.errors, 2);

    let manifest: GoldManifest = read_yaml(&gold.manifest_path).unwrap();
    let built: Vec<&str> = manifest.outputs.iter().map(|o| o.name.as_str()).collect();
    for name in ["dim_customer", "dim_product", "fact_sales", "agg_exec_kpis"] {
        assert!(built.contains(&name), "{} should be built", name);
    }

    let skipped = &manifest.skipped;
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].name, "dim_location");
    assert!(skipped[0].reason.starts_with(SKIP_SOURCE_ABSENT));

    let failed: Vec<&str> = manifest.errors.iter().map(|e| e.item.as_str()).collect();
    assert_eq!(failed, vec!["agg_geo_performance", "wide_sales_enriched"]);
    assert!(manifest
        .errors
        .iter()
        .all(|e| e.error_type == "ERR_MISSING_DEPENDENCY"));
    assert_eq!(manifest.metrics.marts_failed, 2);
}

#[test]
fn test_gold_plan_limits_marts() {
    // Given
    let ws = Workspace::full();
    let bronze = run_bronze(&ws.cfg, &HtmlReportRenderer).unwrap();
    let silver = run_silver(&ws.cfg, Some(bronze.run_id.as_str()), &HtmlReportRenderer).unwrap();

    // When: only the fact table and one unknown name are requested
    let request = GoldRequest {
        parent_run_id: Some(silver.run_id),
        plan: MartPlan::from_names(["fact_sales", "not_a_mart"]),
    };
    let gold = run_gold(&ws.cfg, &request, &HtmlReportRenderer).unwrap();

    // Then
    assert_eq!(gold.status, RunStatus::Success);
    let manifest: GoldManifest = read_yaml(&gold.manifest_path).unwrap();
    assert_eq!(manifest.metrics.marts_built, 1);
    assert_eq!(manifest.outputs[0].name, "fact_sales");
    assert_eq!(manifest.metrics.marts_skipped, MartKind::ALL.len() - 1);
    assert!(manifest.skipped.iter().all(|s| s.reason == SKIP_DISABLED));
    assert!(manifest.notes.iter().any(|n| n.contains("not_a_mart")));
}

#[test]
fn test_gold_without_silver_runs_is_fatal() {
    // Given
    let ws = Workspace::full();

    // When
    let err = run_gold(&ws.cfg, &GoldRequest::default(), &HtmlReportRenderer).unwrap_err();

    // Then
    assert_eq!(err.kind(), ExErrorKind::NotFound);
    assert!(common::subdirs(&ws.cfg.gold_marts_root()).is_empty());
}
