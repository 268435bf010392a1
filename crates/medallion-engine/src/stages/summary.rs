//! Summary stage: one cross-layer report
//!
//! Reads the manifest of each layer's run (the given ids, or the latest run
//! of each layer) and writes `summary_report.json` and `summary_report.md`
//! under `<reports_root>/<id>/`. A layer without a manifest is reported as
//! `missing`; that is never an error.

#![allow(clippy::result_large_err)]

use super::elapsed_ms;
use crate::config::PipelineConfig;
use chrono::Utc;
use medallion_core::manifest::{
    iso_utc, BronzeManifest, GoldManifest, Layer, LayerDigest, RunInfo, RunStatus,
    SilverManifest, SummaryReport,
};
use medallion_core::orchestration::{StepResult, StepStatus};
use medallion_core::run_id::RunId;
use medallion_core::{log_op_end, log_op_error, log_op_start};
use medallion_store::errors::Result;
use medallion_store::layout::{latest_run_id, RunLayout};
use medallion_store::manifest_io::read_yaml_opt;
use medallion_store::reports::write_summary;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Inputs to one summary
#[derive(Debug, Clone, Default)]
pub struct SummaryRequest {
    /// Orchestrated run this summary belongs to; a fresh id is used if absent
    pub orchestrator_run_id: Option<String>,
    pub bronze_run_id: Option<String>,
    pub silver_run_id: Option<String>,
    pub gold_run_id: Option<String>,
    /// Orchestrator steps so far, if run under the orchestrator
    pub steps: Vec<StepResult>,
}

/// Where the summary was written
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryOutcome {
    pub report_id: String,
    pub report: SummaryReport,
    pub json_path: PathBuf,
    pub markdown_path: PathBuf,
}

/// Build and write the summary report.
///
/// # Errors
///
/// Returns an error only if the report files cannot be written.
pub fn run_summary(cfg: &PipelineConfig, request: &SummaryRequest) -> Result<SummaryOutcome> {
    let timer = Instant::now();
    log_op_start!("summary_run");
    let result = summarize(cfg, request);
    match &result {
        Ok(outcome) => log_op_end!(
            "summary_run",
            duration_ms = elapsed_ms(timer),
            report_id = %outcome.report_id,
            status = %outcome.report.status
        ),
        Err(err) => log_op_error!("summary_run", err.clone(), duration_ms = elapsed_ms(timer)),
    }
    result
}

fn summarize(cfg: &PipelineConfig, request: &SummaryRequest) -> Result<SummaryOutcome> {
    let now = Utc::now();
    let report_id = request
        .orchestrator_run_id
        .clone()
        .unwrap_or_else(|| RunId::generate(now).to_string());

    let layers = vec![
        digest::<BronzeManifest, _>(
            Layer::Bronze,
            &cfg.bronze_root,
            request.bronze_run_id.clone(),
            |m| (&m.run, bronze_counts(m), m.errors.len()),
        ),
        digest::<SilverManifest, _>(
            Layer::Silver,
            &cfg.silver_root,
            request.silver_run_id.clone(),
            |m| (&m.run, silver_counts(m), m.errors.len()),
        ),
        digest::<GoldManifest, _>(
            Layer::Gold,
            &cfg.gold_marts_root(),
            request.gold_run_id.clone(),
            |m| (&m.run, gold_counts(m), m.errors.len()),
        ),
    ];

    let report = SummaryReport {
        orchestrator_run_id: request.orchestrator_run_id.clone(),
        generated_utc: iso_utc(now),
        status: overall_status(&request.steps, &layers).to_string(),
        steps: request.steps.clone(),
        layers,
    };

    let dir = cfg.reports_root.join(&report_id);
    let (json_path, markdown_path) = write_summary(&dir, &report)?;
    Ok(SummaryOutcome {
        report_id,
        report,
        json_path,
        markdown_path,
    })
}

/// Digest of one layer's run. Any failure to find or read the manifest
/// yields a `missing` digest.
fn digest<M, F>(layer: Layer, root: &Path, run_id: Option<String>, view: F) -> LayerDigest
where
    M: DeserializeOwned,
    F: Fn(&M) -> (&RunInfo, BTreeMap<String, u64>, usize),
{
    let run_id = match run_id.or_else(|| latest_run_id(root).ok()) {
        Some(id) => id,
        None => return LayerDigest::missing(layer, None),
    };
    let path = RunLayout::new(root, &run_id).manifest_path();
    let manifest = match read_yaml_opt::<M>(&path) {
        Ok(Some(m)) => m,
        Ok(None) => return LayerDigest::missing(layer, Some(run_id)),
        Err(err) => {
            tracing::warn!(
                layer = layer.as_str(),
                path = %path.display(),
                err_code = err.code(),
                "manifest unreadable; reported as missing"
            );
            return LayerDigest::missing(layer, Some(run_id));
        }
    };

    let (run, counts, errors) = view(&manifest);
    LayerDigest {
        layer,
        run_id: Some(run.run_id.clone()),
        status: run.status.as_str().to_string(),
        started_utc: Some(run.started_utc.clone()),
        ended_utc: Some(run.ended_utc.clone()),
        duration_s: Some(run.duration_s),
        manifest_path: Some(path.display().to_string()),
        counts,
        errors,
    }
}

fn counts<const N: usize>(pairs: [(&str, usize); N]) -> BTreeMap<String, u64> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v as u64))
        .collect()
}

fn bronze_counts(m: &BronzeManifest) -> BTreeMap<String, u64> {
    let s = &m.summary;
    counts([
        ("files_total", s.files_total),
        ("files_success", s.files_success),
        ("files_skipped", s.files_skipped),
        ("files_failed", s.files_failed),
        ("rows_total", s.rows_total),
    ])
}

fn silver_counts(m: &SilverManifest) -> BTreeMap<String, u64> {
    let s = &m.summary;
    counts([
        ("tables_total", s.tables_total),
        ("tables_success", s.tables_success),
        ("tables_failed", s.tables_failed),
        ("rows_in", s.rows_in),
        ("rows_out", s.rows_out),
    ])
}

fn gold_counts(m: &GoldManifest) -> BTreeMap<String, u64> {
    let s = &m.metrics;
    counts([
        ("marts_planned", s.marts_planned),
        ("marts_built", s.marts_built),
        ("marts_skipped", s.marts_skipped),
        ("marts_failed", s.marts_failed),
        ("rows_written", s.rows_written),
    ])
}

/// Orchestrated: `success` iff no step failed. Standalone: from the layers.
fn overall_status(steps: &[StepResult], layers: &[LayerDigest]) -> &'static str {
    if !steps.is_empty() {
        return if steps.iter().any(|s| s.status == StepStatus::Failed) {
            "failed"
        } else {
            "success"
        };
    }
    if layers.iter().any(|l| l.is_missing()) {
        "incomplete"
    } else if layers
        .iter()
        .all(|l| l.status == RunStatus::Success.as_str())
    {
        "success"
    } else {
        "partial"
    }
}
