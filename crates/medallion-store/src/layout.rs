//! Run directory layout
//!
//! ```text
//! <layer_root>/<run_id>/data/        CSV outputs, metadata.yaml, run_log.txt
//! <layer_root>/<run_id>/reports/     HTML report
//! ```
//!
//! Gold runs live under `<gold_root>/marts/`. Bronze keeps its ingestion state
//! in `<bronze_root>/_state/last_ingested.yaml`.

#![allow(clippy::result_large_err)]

use crate::errors::{io_error, Result};
use medallion_core::errors::PipelineError;
use medallion_core::run_id::select_latest;
use std::fs;
use std::path::{Path, PathBuf};

pub const DATA_DIR: &str = "data";
pub const REPORTS_DIR: &str = "reports";
pub const MANIFEST_FILE: &str = "metadata.yaml";
pub const RUN_LOG_FILE: &str = "run_log.txt";
pub const STATE_DIR: &str = "_state";
pub const STATE_FILE: &str = "last_ingested.yaml";
pub const GOLD_MARTS_DIR: &str = "marts";

/// Paths owned by one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLayout {
    run_dir: PathBuf,
}

impl RunLayout {
    pub fn new(layer_root: &Path, run_id: &str) -> Self {
        Self {
            run_dir: layer_root.join(run_id),
        }
    }

    /// Create the run directory with its `data/` and `reports/` subtrees.
    ///
    /// Runs are immutable: an existing directory is an error.
    pub fn create(&self) -> Result<()> {
        if self.run_dir.exists() {
            return Err(PipelineError::RunDirectoryExists {
                path: self.run_dir.display().to_string(),
            }
            .into());
        }
        fs::create_dir_all(self.data_dir()).map_err(|e| io_error("create_run_dir", e))?;
        fs::create_dir_all(self.reports_dir()).map_err(|e| io_error("create_run_dir", e))?;
        Ok(())
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn data_dir(&self) -> PathBuf {
        self.run_dir.join(DATA_DIR)
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.run_dir.join(REPORTS_DIR)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.data_dir().join(MANIFEST_FILE)
    }

    pub fn run_log_path(&self) -> PathBuf {
        self.data_dir().join(RUN_LOG_FILE)
    }

    pub fn data_file(&self, name: &str) -> PathBuf {
        self.data_dir().join(name)
    }

    pub fn report_path(&self, name: &str) -> PathBuf {
        self.reports_dir().join(name)
    }
}

/// Root under which Gold run directories are created
pub fn gold_marts_root(gold_root: &Path) -> PathBuf {
    gold_root.join(GOLD_MARTS_DIR)
}

/// Location of the Bronze ingestion state document
pub fn state_path(bronze_root: &Path) -> PathBuf {
    bronze_root.join(STATE_DIR).join(STATE_FILE)
}

/// Newest run id among the directories directly under `layer_root`.
///
/// Entries that are not valid run ids (including `_state`) are ignored.
pub fn latest_run_id(layer_root: &Path) -> Result<String> {
    let not_found = || PipelineError::RunNotFound {
        root: layer_root.display().to_string(),
    };
    if !layer_root.is_dir() {
        return Err(not_found().into());
    }
    let mut names = Vec::new();
    for entry in fs::read_dir(layer_root).map_err(|e| io_error("list_runs", e))? {
        let entry = entry.map_err(|e| io_error("list_runs", e))?;
        if entry.path().is_dir() {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
    }
    select_latest(names.iter().map(String::as_str)).ok_or_else(|| not_found().into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use medallion_core::errors::ExErrorKind;
    use tempfile::TempDir;

    #[test]
    fn test_create_refuses_existing_run() {
        let root = TempDir::new().unwrap();
        let layout = RunLayout::new(root.path(), "20240102_030405_#abcdef12");

        layout.create().unwrap();
        assert!(layout.data_dir().is_dir());
        assert!(layout.reports_dir().is_dir());

        let err = layout.create().unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::AlreadyExists);
    }

    #[test]
    fn test_latest_ignores_state_and_junk() {
        let root = TempDir::new().unwrap();
        for name in [
            "20240102_030405_#abcdef12",
            "20240302_030405_#abcdef12",
            "_state",
            "99999999_junk",
        ] {
            fs::create_dir_all(root.path().join(name)).unwrap();
        }
        fs::write(root.path().join("20250101_000000_#zzzzzzzz"), b"file").unwrap();

        assert_eq!(
            latest_run_id(root.path()).unwrap(),
            "20240302_030405_#abcdef12"
        );
    }

    #[test]
    fn test_latest_on_empty_root_is_not_found() {
        let root = TempDir::new().unwrap();
        let err = latest_run_id(root.path()).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::NotFound);
        assert!(latest_run_id(&root.path().join("missing")).is_err());
    }
}
