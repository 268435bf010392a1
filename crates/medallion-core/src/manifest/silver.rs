use super::{ItemError, ItemStatus, RunInfo};
use crate::table::ColumnSchema;
use serde::{Deserialize, Serialize};

/// Fingerprint of the Bronze file a table was read from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputFingerprint {
    pub path: String,
    pub size_bytes: u64,
    pub mtime_utc: String,
    pub sha256: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRef {
    pub path: String,
    pub sha256: String,
}

/// One normalized table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableEntry {
    pub table: String,
    pub status: ItemStatus,
    pub rows_in: Option<usize>,
    pub rows_out: Option<usize>,
    #[serde(default)]
    pub schema_in: Vec<ColumnSchema>,
    #[serde(default)]
    pub schema_out: Vec<ColumnSchema>,
    #[serde(default)]
    pub input: Option<InputFingerprint>,
    #[serde(default)]
    pub output: Option<OutputRef>,
    pub duration_s: f64,
    #[serde(default)]
    pub error: Option<ItemError>,
}

/// Where the Silver run read from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SilverLineage {
    pub bronze_run_id: String,
    pub bronze_data_dir: String,
    pub bronze_manifest_found: bool,
    #[serde(default)]
    pub bronze_started_utc: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformSummary {
    pub tables_total: usize,
    pub tables_success: usize,
    pub tables_failed: usize,
    pub rows_in: usize,
    pub rows_out: usize,
}

impl TransformSummary {
    pub fn from_entries(entries: &[TableEntry]) -> Self {
        let ok = entries
            .iter()
            .filter(|e| e.status == ItemStatus::Success);
        Self {
            tables_total: entries.len(),
            tables_success: ok.clone().count(),
            tables_failed: entries
                .iter()
                .filter(|e| e.status == ItemStatus::Failed)
                .count(),
            rows_in: ok.clone().filter_map(|e| e.rows_in).sum(),
            rows_out: ok.filter_map(|e| e.rows_out).sum(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SilverManifest {
    pub run: RunInfo,
    pub source: SilverLineage,
    pub tables: Vec<TableEntry>,
    pub summary: TransformSummary,
    #[serde(default)]
    pub errors: Vec<ItemError>,
}
