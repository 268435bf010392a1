//! Stage runners
//!
//! Each runner validates everything it can before creating its run
//! directory, so a fatal error leaves no artifacts behind. Once the
//! directory exists, item failures are recorded in the manifest and the
//! runner still returns `Ok`.

pub mod bronze;
pub mod gold;
pub mod silver;
pub mod summary;

pub use bronze::run_bronze;
pub use gold::{run_gold, GoldRequest};
pub use silver::run_silver;
pub use summary::{run_summary, SummaryRequest};

use medallion_core::manifest::{Layer, RunStatus};
use std::path::PathBuf;

/// What a stage run produced
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutcome {
    pub layer: Layer,
    pub run_id: String,
    pub parent_run_id: Option<String>,
    pub status: RunStatus,
    pub run_dir: PathBuf,
    pub manifest_path: PathBuf,
    /// Bronze only: every discovered file was unchanged
    pub no_new_data: bool,
    /// Failed items (files, tables or marts)
    pub errors: usize,
}

impl StageOutcome {
    /// 0 success, 2 partial
    pub fn exit_code(&self) -> i32 {
        self.status.exit_code()
    }
}

fn elapsed_ms(start: std::time::Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
