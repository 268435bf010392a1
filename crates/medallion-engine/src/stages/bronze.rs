//! Bronze stage: incremental ingestion of raw CSV extracts
//!
//! ## Per file
//! 1. Fingerprint (mtime, SHA-256, size); a missing file is FAILED
//! 2. Compare with the ingestion state; unchanged files are SKIPPED
//! 3. Changed files are parsed (row count, header schema) and copied
//!    byte-for-byte into the run's `data/`, both with bounded retry
//!
//! A file name already taken by an earlier source system in the same batch
//! is FAILED with `ERR_ALREADY_EXISTS` instead of overwriting the first copy.
//!
//! ## End of batch
//! The ingestion state is replaced only if no file failed, and then only
//! with the SUCCESS and SKIPPED entries of this run.

#![allow(clippy::result_large_err)]

use super::{elapsed_ms, StageOutcome};
use crate::config::{PipelineConfig, SourceSpec};
use chrono::Utc;
use globset::{Glob, GlobMatcher};
use medallion_core::errors::{ExError, PipelineError};
use medallion_core::manifest::{
    duration_s, iso_utc, BronzeManifest, IngestSummary, ItemError, ItemStatus, Layer, RunInfo,
    RunStatus, SourceFileRecord, SourceSummary,
};
use medallion_core::render::ReportRenderer;
use medallion_core::run_id::RunId;
use medallion_core::{log_op_end, log_op_error, log_op_start};
use medallion_core_types::schema::{
    RUN_EVENT_END, RUN_EVENT_ERROR, RUN_EVENT_SKIPPED, RUN_EVENT_START, RUN_EVENT_STATE,
    RUN_EVENT_SUCCESS,
};
use medallion_store::atomic::atomic_write_with;
use medallion_store::csv_io::read_table;
use medallion_store::errors::{io_error, Result};
use medallion_store::fingerprint::FileFingerprint;
use medallion_store::layout::{state_path, RunLayout};
use medallion_store::manifest_io::write_yaml;
use medallion_store::reports::{write_report, BRONZE_REPORT_FILE};
use medallion_store::retry::with_retry;
use medallion_store::state::{IngestionState, StateEntry};
use medallion_store::RunLog;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Instant;

pub const SKIP_UNCHANGED: &str = "unchanged";

/// A file selected for ingestion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub source_system: String,
    pub file: String,
    pub path: PathBuf,
}

/// Run one Bronze ingestion.
///
/// # Errors
///
/// Fatal only: a missing source root, an invalid glob, an unreadable state
/// document or a failure to create or write the run's own artifacts.
pub fn run_bronze(cfg: &PipelineConfig, renderer: &dyn ReportRenderer) -> Result<StageOutcome> {
    let timer = Instant::now();
    log_op_start!("bronze_run");
    let result = ingest(cfg, renderer);
    match &result {
        Ok(outcome) => log_op_end!(
            "bronze_run",
            duration_ms = elapsed_ms(timer),
            run_id = %outcome.run_id,
            status = outcome.status.as_str()
        ),
        Err(err) => log_op_error!("bronze_run", err.clone(), duration_ms = elapsed_ms(timer)),
    }
    result
}

fn ingest(cfg: &PipelineConfig, renderer: &dyn ReportRenderer) -> Result<StageOutcome> {
    cfg.validate_sources()?;

    let mut sources = Vec::new();
    let mut candidates = Vec::new();
    for source in cfg.sources() {
        let found = discover(source)?;
        sources.push(SourceSummary {
            source_system: source.system.clone(),
            root: absolute(&source.root).display().to_string(),
            include_glob: source.include_glob.clone(),
            exclude_glob: source.exclude_glob.clone(),
            files_discovered: found.len(),
        });
        candidates.extend(found);
    }

    let state_file = state_path(&cfg.bronze_root);
    let previous = IngestionState::load(&state_file)?;

    let started = Utc::now();
    let run_id = RunId::generate(started).to_string();
    let layout = RunLayout::new(&cfg.bronze_root, &run_id);
    layout.create()?;

    let mut log = RunLog::new(layout.run_log_path(), &run_id);
    log.append(
        RUN_EVENT_START,
        &[
            ("run_id", run_id.clone()),
            ("files", candidates.len().to_string()),
        ],
    )?;

    let mut records = Vec::with_capacity(candidates.len());
    let mut next_files = BTreeMap::new();
    let mut claimed: BTreeMap<&str, &str> = BTreeMap::new();
    for candidate in &candidates {
        // Outputs share one data/ directory, first source system wins the name
        let (record, entry) = match claimed.get(candidate.file.as_str()).copied() {
            Some(owner) => (duplicate_record(candidate, owner), None),
            None => {
                claimed.insert(&candidate.file, &candidate.source_system);
                ingest_file(cfg, candidate, &layout, &previous)
            }
        };
        log_record(&mut log, &record)?;
        if let Some(entry) = entry {
            next_files.insert(record.source_path.clone(), entry);
        }
        records.push(record);
    }

    let mut summary = IngestSummary::from_records(&records);
    let errors: Vec<ItemError> = records
        .iter()
        .filter(|r| r.status == ItemStatus::Failed)
        .map(|r| {
            ItemError::new(
                r.file.clone(),
                r.error_type.clone().unwrap_or_default(),
                r.error_message.clone().unwrap_or_default(),
            )
        })
        .collect();

    let ended = Utc::now();
    if summary.files_failed == 0 {
        let next = IngestionState {
            updated_utc: Some(iso_utc(ended)),
            files: next_files,
        };
        next.save(&state_file)?;
        summary.state_updated = true;
    }
    log.append(
        RUN_EVENT_STATE,
        &[("updated", summary.state_updated.to_string())],
    )?;

    let status = RunStatus::from_failures(summary.files_failed);
    let manifest = BronzeManifest {
        run: RunInfo::finished(Layer::Bronze, &run_id, None, started, ended, status),
        sources,
        files: records,
        summary: summary.clone(),
        errors,
    };
    write_yaml(&layout.manifest_path(), &manifest)?;
    write_report(
        &layout.report_path(BRONZE_REPORT_FILE),
        &renderer.render_bronze(&manifest),
    )?;

    log.append(
        RUN_EVENT_END,
        &[
            ("run_id", run_id.clone()),
            ("status", status.as_str().to_string()),
            ("success", summary.files_success.to_string()),
            ("skipped", summary.files_skipped.to_string()),
            ("failed", summary.files_failed.to_string()),
            ("duration_s", format!("{:.3}", duration_s(started, ended))),
        ],
    )?;

    Ok(StageOutcome {
        layer: Layer::Bronze,
        run_id,
        parent_run_id: None,
        status,
        run_dir: layout.run_dir().to_path_buf(),
        manifest_path: layout.manifest_path(),
        no_new_data: summary.no_new_data(),
        errors: summary.files_failed,
    })
}

/// Files to ingest for one source system, sorted by name.
///
/// Directory entries must match the include glob and not the exclude glob.
/// Declared files are always included, present or not.
///
/// # Errors
///
/// Returns `InvalidGlob` for a bad pattern and an IO error if the root
/// cannot be listed.
pub fn discover(source: &SourceSpec) -> Result<Vec<Candidate>> {
    let include = matcher(&source.include_glob)?;
    let exclude = source.exclude_glob.as_deref().map(matcher).transpose()?;

    let mut by_name: BTreeMap<String, PathBuf> = BTreeMap::new();
    let root = absolute(&source.root);
    for entry in fs::read_dir(&root).map_err(|e| io_error("discover_sources", e))? {
        let entry = entry.map_err(|e| io_error("discover_sources", e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        let excluded = exclude.as_ref().is_some_and(|m| m.is_match(&name));
        if include.is_match(&name) && !excluded {
            by_name.insert(name, path);
        }
    }
    for declared in &source.files {
        by_name
            .entry(declared.clone())
            .or_insert_with(|| root.join(declared));
    }

    Ok(by_name
        .into_iter()
        .map(|(file, path)| Candidate {
            source_system: source.system.clone(),
            file,
            path,
        })
        .collect())
}

/// Process one candidate. Never fails: errors land in the record.
///
/// Returns the state entry to carry forward for SUCCESS and SKIPPED files.
fn ingest_file(
    cfg: &PipelineConfig,
    candidate: &Candidate,
    layout: &RunLayout,
    previous: &IngestionState,
) -> (SourceFileRecord, Option<StateEntry>) {
    let source_path = candidate.path.display().to_string();
    let mut record =
        SourceFileRecord::pending(&candidate.file, &candidate.source_system, &source_path);

    let fingerprint = match FileFingerprint::of(&candidate.path) {
        Ok(fp) => fp,
        Err(err) => {
            fail(&mut record, &err.with_item(&candidate.file));
            return (record, None);
        }
    };
    record.size_bytes = Some(fingerprint.size_bytes);
    record.mtime_utc = Some(fingerprint.mtime_utc.clone());
    record.sha256 = Some(fingerprint.sha256.clone());
    let entry = StateEntry::new(&candidate.source_system, &fingerprint);

    if !previous.is_changed(&source_path, &fingerprint) {
        record.status = ItemStatus::Skipped;
        record.skip_reason = Some(SKIP_UNCHANGED.to_string());
        return (record, Some(entry));
    }
    record.is_changed = true;

    let read_timer = Instant::now();
    let table = match with_retry(&cfg.retry, "read_source", || read_table(&candidate.path)) {
        Ok(table) => table,
        Err(err) => {
            fail(&mut record, &err.with_item(&candidate.file));
            return (record, None);
        }
    };
    record.read_duration_s = Some(read_timer.elapsed().as_secs_f64());
    record.rows = Some(table.len());
    record.schema = table.schema();

    let dest = layout.data_file(&candidate.file);
    let copy_timer = Instant::now();
    if let Err(err) = with_retry(&cfg.retry, "copy_source", || copy_file(&candidate.path, &dest)) {
        fail(&mut record, &err.with_item(&candidate.file));
        return (record, None);
    }
    record.copy_duration_s = Some(copy_timer.elapsed().as_secs_f64());
    record.output_path = Some(dest.display().to_string());
    record.status = ItemStatus::Success;
    (record, Some(entry))
}

fn duplicate_record(candidate: &Candidate, claimed_by: &str) -> SourceFileRecord {
    let source_path = candidate.path.display().to_string();
    let mut record =
        SourceFileRecord::pending(&candidate.file, &candidate.source_system, &source_path);
    let err: ExError = PipelineError::DuplicateSourceFile {
        file: candidate.file.clone(),
        source_system: candidate.source_system.clone(),
        claimed_by: claimed_by.to_string(),
    }
    .into();
    fail(&mut record, &err);
    record
}

/// Byte-for-byte copy through the atomic writer
fn copy_file(src: &Path, dest: &Path) -> Result<()> {
    atomic_write_with(dest, |w| {
        let mut input = File::open(src).map_err(|e| io_error("copy_source", e))?;
        std::io::copy(&mut input, w)
            .map(|_| ())
            .map_err(|e| io_error("copy_source", e))
    })
}

fn fail(record: &mut SourceFileRecord, err: &ExError) {
    record.status = ItemStatus::Failed;
    record.error_type = Some(err.code().to_string());
    record.error_message = Some(if err.message().is_empty() {
        err.to_string()
    } else {
        err.message().to_string()
    });
}

fn log_record(log: &mut RunLog, record: &SourceFileRecord) -> Result<()> {
    let file = ("file", record.file.clone());
    match record.status {
        ItemStatus::Success => log.append(
            RUN_EVENT_SUCCESS,
            &[file, ("rows", record.rows.unwrap_or(0).to_string())],
        ),
        ItemStatus::Skipped => log.append(
            RUN_EVENT_SKIPPED,
            &[
                file,
                ("reason", record.skip_reason.clone().unwrap_or_default()),
            ],
        ),
        ItemStatus::Failed => log.append(
            RUN_EVENT_ERROR,
            &[
                file,
                ("error_type", record.error_type.clone().unwrap_or_default()),
                ("error", record.error_message.clone().unwrap_or_default()),
            ],
        ),
    }
}

fn matcher(pattern: &str) -> Result<GlobMatcher> {
    Glob::new(pattern)
        .map(|g| g.compile_matcher())
        .map_err(|e| {
            PipelineError::InvalidGlob {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            }
            .into()
        })
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|dir| dir.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
