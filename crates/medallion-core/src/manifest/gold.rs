use super::{ItemError, RunInfo};
use crate::gold::MartCategory;
use crate::table::ColumnSchema;
use serde::{Deserialize, Serialize};

/// Where the Gold run read from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoldLineage {
    pub silver_run_id: String,
    pub suffix: String,
    pub silver_data_dir: String,
}

/// One mart written by the run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MartOutput {
    pub name: String,
    pub category: MartCategory,
    pub path: String,
    pub rows: usize,
    pub columns: Vec<String>,
    pub schema: Vec<ColumnSchema>,
    pub sha256: String,
    pub duration_s: f64,
}

/// A mart that was not attempted, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedMart {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoldMetrics {
    pub marts_planned: usize,
    pub marts_built: usize,
    pub marts_skipped: usize,
    pub marts_failed: usize,
    pub rows_written: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldManifest {
    pub run: RunInfo,
    pub source: GoldLineage,
    /// Marts enabled by the plan, in catalog order
    pub plan: Vec<String>,
    pub outputs: Vec<MartOutput>,
    #[serde(default)]
    pub skipped: Vec<SkippedMart>,
    pub metrics: GoldMetrics,
    #[serde(default)]
    pub errors: Vec<ItemError>,
    #[serde(default)]
    pub notes: Vec<String>,
}
