use super::{ItemError, ItemStatus, RunInfo};
use crate::table::ColumnSchema;
use serde::{Deserialize, Serialize};

/// Outcome for one raw source file in one Bronze run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFileRecord {
    pub file: String,
    pub source_system: String,
    pub source_path: String,
    pub status: ItemStatus,
    #[serde(default)]
    pub skip_reason: Option<String>,
    pub is_changed: bool,
    #[serde(default)]
    pub rows: Option<usize>,
    #[serde(default)]
    pub schema: Vec<ColumnSchema>,
    #[serde(default)]
    pub size_bytes: Option<u64>,
    #[serde(default)]
    pub mtime_utc: Option<String>,
    #[serde(default)]
    pub sha256: Option<String>,
    #[serde(default)]
    pub read_duration_s: Option<f64>,
    #[serde(default)]
    pub copy_duration_s: Option<f64>,
    #[serde(default)]
    pub output_path: Option<String>,
    #[serde(default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl SourceFileRecord {
    /// Record with identity fields set and every outcome field empty
    pub fn pending(file: &str, source_system: &str, source_path: &str) -> Self {
        Self {
            file: file.to_string(),
            source_system: source_system.to_string(),
            source_path: source_path.to_string(),
            status: ItemStatus::Failed,
            skip_reason: None,
            is_changed: false,
            rows: None,
            schema: Vec::new(),
            size_bytes: None,
            mtime_utc: None,
            sha256: None,
            read_duration_s: None,
            copy_duration_s: None,
            output_path: None,
            error_type: None,
            error_message: None,
        }
    }
}

/// Discovery settings and result for one source system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSummary {
    pub source_system: String,
    pub root: String,
    pub include_glob: String,
    #[serde(default)]
    pub exclude_glob: Option<String>,
    pub files_discovered: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSummary {
    pub files_total: usize,
    pub files_success: usize,
    pub files_skipped: usize,
    pub files_failed: usize,
    pub rows_total: usize,
    /// At least one file was copied in this run
    pub has_new_data: bool,
    /// Ingestion state was replaced at the end of this run
    #[serde(default)]
    pub state_updated: bool,
}

impl IngestSummary {
    pub fn from_records(records: &[SourceFileRecord]) -> Self {
        let count = |status: ItemStatus| records.iter().filter(|r| r.status == status).count();
        let files_success = count(ItemStatus::Success);
        Self {
            files_total: records.len(),
            files_success,
            files_skipped: count(ItemStatus::Skipped),
            files_failed: count(ItemStatus::Failed),
            rows_total: records
                .iter()
                .filter(|r| r.status == ItemStatus::Success)
                .filter_map(|r| r.rows)
                .sum(),
            has_new_data: files_success > 0,
            state_updated: false,
        }
    }

    /// Files were seen and every one of them was unchanged
    pub fn no_new_data(&self) -> bool {
        self.files_total > 0 && self.files_success == 0 && self.files_failed == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BronzeManifest {
    pub run: RunInfo,
    pub sources: Vec<SourceSummary>,
    pub files: Vec<SourceFileRecord>,
    pub summary: IngestSummary,
    #[serde(default)]
    pub errors: Vec<ItemError>,
}
