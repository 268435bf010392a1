//! Gold stage: build the mart catalog from one Silver run
//!
//! ## Per mart, in build order
//! - disabled by the plan: skipped
//! - a required Silver table is absent: skipped
//! - otherwise built; a missing required mart, a schema mismatch or a build
//!   error is recorded against the mart and the next mart is attempted
//!
//! Status is SUCCESS with no errors, PARTIAL otherwise.

#![allow(clippy::result_large_err)]

use super::{elapsed_ms, StageOutcome};
use crate::config::PipelineConfig;
use chrono::Utc;
use medallion_core::errors::{ExError, PipelineError};
use medallion_core::gold::{build_mart, build_order, BuildInputs, MartKind, MartPlan, Upstream};
use medallion_core::manifest::{
    duration_s, GoldLineage, GoldManifest, GoldMetrics, ItemError, Layer, MartOutput, RunInfo,
    RunStatus, SkippedMart,
};
use medallion_core::render::ReportRenderer;
use medallion_core::run_id::RunId;
use medallion_core::silver::SourceTable;
use medallion_core::table::Table;
use medallion_core::{log_op_end, log_op_error, log_op_start};
use medallion_core_types::schema::{
    RUN_EVENT_END, RUN_EVENT_ERROR, RUN_EVENT_SKIPPED, RUN_EVENT_START, RUN_EVENT_SUCCESS,
};
use medallion_store::csv_io::{read_table, write_table};
use medallion_store::errors::Result;
use medallion_store::layout::{latest_run_id, RunLayout};
use medallion_store::manifest_io::write_yaml;
use medallion_store::reports::{write_report, GOLD_REPORT_FILE};
use medallion_store::RunLog;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

pub const SKIP_DISABLED: &str = "disabled by plan";
pub const SKIP_SOURCE_ABSENT: &str = "source table absent";

/// Inputs to one Gold run
#[derive(Debug, Clone, Default)]
pub struct GoldRequest {
    /// Silver run to read; the latest when absent
    pub parent_run_id: Option<String>,
    pub plan: MartPlan,
}

impl GoldRequest {
    /// Request with a plan read from a JSON document on disk
    ///
    /// # Errors
    ///
    /// Returns a config error if the plan file cannot be read. A readable
    /// but malformed plan enables every mart.
    pub fn with_plan_file(parent_run_id: Option<String>, plan_file: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(plan_file).map_err(|e| {
            ExError::from(PipelineError::Config {
                reason: format!("cannot read plan {}: {}", plan_file.display(), e),
            })
        })?;
        Ok(Self {
            parent_run_id,
            plan: MartPlan::from_json(&text),
        })
    }
}

/// Run one Gold build.
///
/// # Errors
///
/// Fatal only: no Silver run to read, an invalid parent run id, a missing
/// parent data directory, an existing target run directory, or a failure to
/// write the run's own artifacts.
pub fn run_gold(
    cfg: &PipelineConfig,
    request: &GoldRequest,
    renderer: &dyn ReportRenderer,
) -> Result<StageOutcome> {
    let timer = Instant::now();
    log_op_start!("gold_run");
    let result = build(cfg, request, renderer);
    match &result {
        Ok(outcome) => log_op_end!(
            "gold_run",
            duration_ms = elapsed_ms(timer),
            run_id = %outcome.run_id,
            status = outcome.status.as_str()
        ),
        Err(err) => log_op_error!("gold_run", err.clone(), duration_ms = elapsed_ms(timer)),
    }
    result
}

fn build(
    cfg: &PipelineConfig,
    request: &GoldRequest,
    renderer: &dyn ReportRenderer,
) -> Result<StageOutcome> {
    let parent = match &request.parent_run_id {
        Some(id) => id.clone(),
        None => latest_run_id(&cfg.silver_root)?,
    };
    let parent_id = RunId::parse(&parent)?;

    let silver_data = RunLayout::new(&cfg.silver_root, &parent).data_dir();
    if !silver_data.is_dir() {
        return Err(PipelineError::UpstreamMissing {
            path: silver_data.display().to_string(),
        }
        .into());
    }
    let order = build_order(&MartKind::ALL)?;

    let started = Utc::now();
    let run_id = parent_id.derive(started).to_string();
    let layout = RunLayout::new(&cfg.gold_marts_root(), &run_id);
    layout.create()?;

    let mut log = RunLog::new(layout.run_log_path(), &run_id);
    log.append(
        RUN_EVENT_START,
        &[
            ("run_id", run_id.clone()),
            ("parent_run_id", parent.clone()),
            ("plan", request.plan.enabled_names().join(",")),
        ],
    )?;

    let mut errors = Vec::new();
    let mut notes: Vec<String> = request
        .plan
        .unknown_names()
        .iter()
        .map(|name| format!("unknown mart in plan ignored: {}", name))
        .collect();

    let (sources, load_errors) = load_sources(&silver_data);
    for err in load_errors {
        log.append(
            RUN_EVENT_ERROR,
            &[
                ("table", err.item.clone()),
                ("error_type", err.error_type.clone()),
                ("error", err.error_message.clone()),
            ],
        )?;
        notes.push(format!("{} could not be read and was treated as absent", err.item));
        errors.push(err);
    }
    let mut inputs = BuildInputs::new(sources);

    let mut outputs = Vec::new();
    let mut skipped = Vec::new();
    for mart in order {
        if !request.plan.is_enabled(mart) {
            skipped.push(SkippedMart {
                name: mart.name().to_string(),
                reason: SKIP_DISABLED.to_string(),
            });
            log.append(
                RUN_EVENT_SKIPPED,
                &[
                    ("mart", mart.name().to_string()),
                    ("reason", SKIP_DISABLED.to_string()),
                ],
            )?;
            continue;
        }

        if let Some(absent) = absent_required_source(mart, &inputs) {
            let reason = format!("{}: {}", SKIP_SOURCE_ABSENT, absent.name());
            log.append(
                RUN_EVENT_SKIPPED,
                &[("mart", mart.name().to_string()), ("reason", reason.clone())],
            )?;
            skipped.push(SkippedMart {
                name: mart.name().to_string(),
                reason,
            });
            continue;
        }

        let timer = Instant::now();
        match build_and_write(mart, &inputs, &layout) {
            Ok((table, mut output)) => {
                output.duration_s = timer.elapsed().as_secs_f64();
                log.append(
                    RUN_EVENT_SUCCESS,
                    &[
                        ("mart", mart.name().to_string()),
                        ("rows", output.rows.to_string()),
                    ],
                )?;
                outputs.push(output);
                inputs.insert_mart(mart, table);
            }
            Err(err) => {
                let item = ItemError::from_error(mart.name(), &err);
                log.append(
                    RUN_EVENT_ERROR,
                    &[
                        ("mart", mart.name().to_string()),
                        ("error_type", item.error_type.clone()),
                        ("error", item.error_message.clone()),
                    ],
                )?;
                tracing::warn!(mart = mart.name(), err_code = err.code(), "mart build failed");
                errors.push(item);
            }
        }
    }

    let metrics = GoldMetrics {
        marts_planned: MartKind::ALL
            .iter()
            .filter(|m| request.plan.is_enabled(**m))
            .count(),
        marts_built: outputs.len(),
        marts_skipped: skipped.len(),
        marts_failed: errors
            .iter()
            .filter(|e| MartKind::from_name(&e.item).is_ok())
            .count(),
        rows_written: outputs.iter().map(|o| o.rows).sum(),
    };
    let status = RunStatus::from_failures(errors.len());
    let ended = Utc::now();

    let manifest = GoldManifest {
        run: RunInfo::finished(
            Layer::Gold,
            &run_id,
            Some(parent.clone()),
            started,
            ended,
            status,
        ),
        source: GoldLineage {
            silver_run_id: parent.clone(),
            suffix: parent_id.suffix().to_string(),
            silver_data_dir: silver_data.display().to_string(),
        },
        plan: request.plan.enabled_names(),
        outputs,
        skipped,
        metrics: metrics.clone(),
        errors,
        notes,
    };
    write_yaml(&layout.manifest_path(), &manifest)?;
    write_report(
        &layout.report_path(GOLD_REPORT_FILE),
        &renderer.render_gold(&manifest),
    )?;

    log.append(
        RUN_EVENT_END,
        &[
            ("run_id", run_id.clone()),
            ("status", status.as_str().to_string()),
            ("built", metrics.marts_built.to_string()),
            ("failed", metrics.marts_failed.to_string()),
            ("duration_s", format!("{:.3}", duration_s(started, ended))),
        ],
    )?;

    Ok(StageOutcome {
        layer: Layer::Gold,
        run_id,
        parent_run_id: Some(parent),
        status,
        run_dir: layout.run_dir().to_path_buf(),
        manifest_path: layout.manifest_path(),
        no_new_data: false,
        errors: manifest.errors.len(),
    })
}

/// Read every known Silver table that exists; unreadable ones become errors
fn load_sources(silver_data: &Path) -> (BTreeMap<SourceTable, Table>, Vec<ItemError>) {
    let mut sources = BTreeMap::new();
    let mut errors = Vec::new();
    for table in SourceTable::KNOWN {
        let path = silver_data.join(table.file_name());
        if !path.is_file() {
            continue;
        }
        match read_table(&path) {
            Ok(t) => {
                sources.insert(table, t);
            }
            Err(err) => errors.push(ItemError::from_error(table.name(), &err)),
        }
    }
    (sources, errors)
}

/// First required Silver table the mart needs that is not loaded
fn absent_required_source(mart: MartKind, inputs: &BuildInputs) -> Option<SourceTable> {
    mart.dependencies()
        .into_iter()
        .filter(|dep| dep.required)
        .find_map(|dep| match dep.upstream {
            Upstream::Source(table) if !inputs.has_source(&table) => Some(table),
            _ => None,
        })
}

fn build_and_write(
    mart: MartKind,
    inputs: &BuildInputs,
    layout: &RunLayout,
) -> Result<(Table, MartOutput)> {
    let table = build_mart(mart, inputs).map_err(|e| ExError::from(e).with_item(mart.name()))?;
    let path = layout.data_file(&mart.output_file_name());
    let sha256 = write_table(&path, &table)?;
    let output = MartOutput {
        name: mart.name().to_string(),
        category: mart.category(),
        path: path.display().to_string(),
        rows: table.len(),
        columns: table.columns().to_vec(),
        schema: table.schema(),
        sha256,
        duration_s: 0.0,
    };
    Ok((table, output))
}
