//! Silver stage: per-table normalization of one Bronze run
//!
//! The parent Bronze run is the one given, or the latest under the Bronze
//! root. The Silver run id keeps the parent's suffix. Every `*.csv` in the
//! parent's `data/` is transformed independently; a failed table is recorded
//! and the rest continue.

#![allow(clippy::result_large_err)]

use super::{elapsed_ms, StageOutcome};
use crate::config::PipelineConfig;
use chrono::Utc;
use medallion_core::errors::PipelineError;
use medallion_core::manifest::{
    duration_s, BronzeManifest, InputFingerprint, ItemError, ItemStatus, Layer, OutputRef,
    RunInfo, RunStatus, SilverLineage, SilverManifest, TableEntry, TransformSummary,
};
use medallion_core::render::ReportRenderer;
use medallion_core::run_id::RunId;
use medallion_core::silver::{transform_table, SourceTable};
use medallion_core::{log_op_end, log_op_error, log_op_start};
use medallion_core_types::schema::{
    RUN_EVENT_END, RUN_EVENT_ERROR, RUN_EVENT_START, RUN_EVENT_SUCCESS,
};
use medallion_store::csv_io::{read_table, write_table};
use medallion_store::errors::{io_error, Result};
use medallion_store::fingerprint::FileFingerprint;
use medallion_store::layout::{latest_run_id, RunLayout};
use medallion_store::manifest_io::{read_yaml_opt, write_yaml};
use medallion_store::reports::{write_report, SILVER_REPORT_FILE};
use medallion_store::RunLog;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Run one Silver transform.
///
/// # Errors
///
/// Fatal only: no Bronze run to read, an invalid parent run id, a missing
/// parent data directory, an existing target run directory, or a failure to
/// write the run's own artifacts.
pub fn run_silver(
    cfg: &PipelineConfig,
    parent_run_id: Option<&str>,
    renderer: &dyn ReportRenderer,
) -> Result<StageOutcome> {
    let timer = Instant::now();
    log_op_start!("silver_run");
    let result = transform(cfg, parent_run_id, renderer);
    match &result {
        Ok(outcome) => log_op_end!(
            "silver_run",
            duration_ms = elapsed_ms(timer),
            run_id = %outcome.run_id,
            status = outcome.status.as_str()
        ),
        Err(err) => log_op_error!("silver_run", err.clone(), duration_ms = elapsed_ms(timer)),
    }
    result
}

fn transform(
    cfg: &PipelineConfig,
    parent_run_id: Option<&str>,
    renderer: &dyn ReportRenderer,
) -> Result<StageOutcome> {
    let parent = match parent_run_id {
        Some(id) => id.to_string(),
        None => latest_run_id(&cfg.bronze_root)?,
    };
    let parent_id = RunId::parse(&parent)?;

    let bronze = RunLayout::new(&cfg.bronze_root, &parent);
    let bronze_data = bronze.data_dir();
    if !bronze_data.is_dir() {
        return Err(PipelineError::UpstreamMissing {
            path: bronze_data.display().to_string(),
        }
        .into());
    }
    let inputs = list_csv(&bronze_data)?;
    let bronze_manifest = read_bronze_manifest(&bronze.manifest_path());

    let started = Utc::now();
    let run_id = parent_id.derive(started).to_string();
    let layout = RunLayout::new(&cfg.silver_root, &run_id);
    layout.create()?;

    let mut log = RunLog::new(layout.run_log_path(), &run_id);
    log.append(
        RUN_EVENT_START,
        &[
            ("run_id", run_id.clone()),
            ("parent_run_id", parent.clone()),
            ("tables", inputs.len().to_string()),
        ],
    )?;

    let mut entries = Vec::with_capacity(inputs.len());
    for input in &inputs {
        let entry = transform_file(input, &layout);
        match &entry.error {
            None => log.append(
                RUN_EVENT_SUCCESS,
                &[
                    ("table", entry.table.clone()),
                    ("rows", entry.rows_out.unwrap_or(0).to_string()),
                ],
            )?,
            Some(err) => log.append(
                RUN_EVENT_ERROR,
                &[
                    ("table", entry.table.clone()),
                    ("error_type", err.error_type.clone()),
                    ("error", err.error_message.clone()),
                ],
            )?,
        }
        entries.push(entry);
    }

    let summary = TransformSummary::from_entries(&entries);
    let errors: Vec<ItemError> = entries.iter().filter_map(|e| e.error.clone()).collect();
    let status = RunStatus::from_failures(summary.tables_failed);
    let ended = Utc::now();

    let manifest = SilverManifest {
        run: RunInfo::finished(
            Layer::Silver,
            &run_id,
            Some(parent.clone()),
            started,
            ended,
            status,
        ),
        source: SilverLineage {
            bronze_run_id: parent.clone(),
            bronze_data_dir: bronze_data.display().to_string(),
            bronze_manifest_found: bronze_manifest.is_some(),
            bronze_started_utc: bronze_manifest.map(|m| m.run.started_utc),
        },
        tables: entries,
        summary: summary.clone(),
        errors,
    };
    write_yaml(&layout.manifest_path(), &manifest)?;
    write_report(
        &layout.report_path(SILVER_REPORT_FILE),
        &renderer.render_silver(&manifest),
    )?;

    log.append(
        RUN_EVENT_END,
        &[
            ("run_id", run_id.clone()),
            ("status", status.as_str().to_string()),
            ("tables_success", summary.tables_success.to_string()),
            ("tables_failed", summary.tables_failed.to_string()),
            ("duration_s", format!("{:.3}", duration_s(started, ended))),
        ],
    )?;

    Ok(StageOutcome {
        layer: Layer::Silver,
        run_id,
        parent_run_id: Some(parent),
        status,
        run_dir: layout.run_dir().to_path_buf(),
        manifest_path: layout.manifest_path(),
        no_new_data: false,
        errors: summary.tables_failed,
    })
}

/// Transform one Bronze CSV into the Silver run. Never fails: errors land
/// in the entry.
fn transform_file(input: &Path, layout: &RunLayout) -> TableEntry {
    let timer = Instant::now();
    let file_name = input
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    let table_name = file_name
        .strip_suffix(".csv")
        .unwrap_or(&file_name)
        .to_string();
    let mut entry = TableEntry {
        table: table_name.clone(),
        status: ItemStatus::Failed,
        rows_in: None,
        rows_out: None,
        schema_in: Vec::new(),
        schema_out: Vec::new(),
        input: None,
        output: None,
        duration_s: 0.0,
        error: None,
    };

    let result = (|| -> Result<()> {
        let fp = FileFingerprint::of(input)?;
        entry.input = Some(InputFingerprint {
            path: input.display().to_string(),
            size_bytes: fp.size_bytes,
            mtime_utc: fp.mtime_utc,
            sha256: fp.sha256,
        });

        let table = read_table(input)?;
        entry.rows_in = Some(table.len());
        entry.schema_in = table.schema();

        let source = SourceTable::from_name(&table_name);
        let cleaned = transform_table(&source, &table)?;

        let out_path = layout.data_file(&file_name);
        let sha256 = write_table(&out_path, &cleaned)?;
        entry.rows_out = Some(cleaned.len());
        entry.schema_out = cleaned.schema();
        entry.output = Some(OutputRef {
            path: out_path.display().to_string(),
            sha256,
        });
        Ok(())
    })();

    match result {
        Ok(()) => entry.status = ItemStatus::Success,
        Err(err) => {
            entry.error = Some(ItemError::from_error(
                table_name.as_str(),
                &err.with_item(table_name.as_str()),
            ))
        }
    }
    entry.duration_s = timer.elapsed().as_secs_f64();
    entry
}

/// `*.csv` files directly under `dir`, sorted by name
fn list_csv(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| io_error("list_bronze_data", e))? {
        let path = entry.map_err(|e| io_error("list_bronze_data", e))?.path();
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        if path.is_file() && is_csv {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// The parent manifest is lineage only; an unreadable one counts as absent.
fn read_bronze_manifest(path: &Path) -> Option<BronzeManifest> {
    match read_yaml_opt::<BronzeManifest>(path) {
        Ok(found) => found,
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                err_code = err.code(),
                "bronze manifest unreadable; lineage recorded without it"
            );
            None
        }
    }
}
