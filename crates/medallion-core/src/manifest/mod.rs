//! Run manifest schema
//!
//! Every layer writes one `metadata.yaml` per run into its `data/` directory.
//! All manifests share a `run` block, a list of per-item outcomes, a summary
//! and an `errors` list of non-fatal failures.
//!
//! ## Common fields
//!
//! - `run.run_id`, `run.layer`, `run.parent_run_id`
//! - `run.started_utc`, `run.ended_utc` (RFC3339, seconds, `Z`)
//! - `run.duration_s`
//! - `run.status`: `SUCCESS`, `PARTIAL` or `FAILED`

pub mod bronze;
pub mod gold;
pub mod silver;
pub mod summary;

pub use bronze::{BronzeManifest, IngestSummary, SourceFileRecord, SourceSummary};
pub use gold::{GoldLineage, GoldManifest, GoldMetrics, MartOutput, SkippedMart};
pub use silver::{InputFingerprint, OutputRef, SilverLineage, SilverManifest, TableEntry, TransformSummary};
pub use summary::{LayerDigest, SummaryReport};

use crate::errors::ExError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const PIPELINE_NAME: &str = "medallion";
pub const PIPELINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Storage layer a run belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Bronze,
    Silver,
    Gold,
}

impl Layer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::Bronze => "bronze",
            Layer::Silver => "silver",
            Layer::Gold => "gold",
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall outcome of a stage run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
    /// Every item succeeded or was skipped
    Success,
    /// At least one item failed; the rest were still processed
    Partial,
    /// The stage could not run at all
    Failed,
}

impl RunStatus {
    /// Process exit code for this status: 0, 2 or 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunStatus::Success => 0,
            RunStatus::Partial => 2,
            RunStatus::Failed => 1,
        }
    }

    pub fn from_failures(failed: usize) -> Self {
        if failed == 0 {
            RunStatus::Success
        } else {
            RunStatus::Partial
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "SUCCESS",
            RunStatus::Partial => "PARTIAL",
            RunStatus::Failed => "FAILED",
        }
    }
}

/// Outcome of one file, table or mart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ItemStatus {
    Success,
    Skipped,
    Failed,
}

/// The `run` block shared by every manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunInfo {
    pub layer: Layer,
    pub pipeline: String,
    pub pipeline_version: String,
    pub run_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_run_id: Option<String>,
    pub started_utc: String,
    pub ended_utc: String,
    pub duration_s: f64,
    pub status: RunStatus,
}

impl RunInfo {
    /// Run block for a finished run
    pub fn finished(
        layer: Layer,
        run_id: impl Into<String>,
        parent_run_id: Option<String>,
        started: DateTime<Utc>,
        ended: DateTime<Utc>,
        status: RunStatus,
    ) -> Self {
        Self {
            layer,
            pipeline: PIPELINE_NAME.to_string(),
            pipeline_version: PIPELINE_VERSION.to_string(),
            run_id: run_id.into(),
            parent_run_id,
            started_utc: iso_utc(started),
            ended_utc: iso_utc(ended),
            duration_s: duration_s(started, ended),
            status,
        }
    }
}

/// A non-fatal failure recorded in a manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemError {
    pub item: String,
    pub error_type: String,
    pub error_message: String,
}

impl ItemError {
    pub fn new(
        item: impl Into<String>,
        error_type: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            item: item.into(),
            error_type: error_type.into(),
            error_message: error_message.into(),
        }
    }

    /// Record an `ExError` against an item; the stable code becomes `error_type`.
    pub fn from_error(item: impl Into<String>, err: &ExError) -> Self {
        let message = if err.message().is_empty() {
            err.to_string()
        } else {
            err.message().to_string()
        };
        Self::new(item, err.code(), message)
    }
}

/// RFC3339 UTC timestamp with second precision
pub fn iso_utc(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Elapsed seconds between two instants, millisecond precision
pub fn duration_s(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let ms = (end - start).num_milliseconds().max(0);
    ms as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExErrorKind;
    use chrono::TimeZone;

    #[test]
    fn test_exit_codes() {
        assert_eq!(RunStatus::Success.exit_code(), 0);
        assert_eq!(RunStatus::Partial.exit_code(), 2);
        assert_eq!(RunStatus::Failed.exit_code(), 1);
        assert_eq!(RunStatus::from_failures(0), RunStatus::Success);
        assert_eq!(RunStatus::from_failures(3), RunStatus::Partial);
    }

    #[test]
    fn test_run_info_timestamps() {
        let start = Utc.with_ymd_and_hms(2024, 3, 4, 5, 6, 7).unwrap();
        let end = start + chrono::Duration::milliseconds(2500);
        let info = RunInfo::finished(
            Layer::Silver,
            "20240304_050607_#abcdef12",
            Some("20240304_050000_#abcdef12".to_string()),
            start,
            end,
            RunStatus::Success,
        );
        assert_eq!(info.started_utc, "2024-03-04T05:06:07Z");
        assert_eq!(info.duration_s, 2.5);
        assert_eq!(info.pipeline, PIPELINE_NAME);
    }

    #[test]
    fn test_status_serializes_uppercase() {
        let yaml = serde_json::to_string(&RunStatus::Partial).unwrap();
        assert_eq!(yaml, "\"PARTIAL\"");
        let item = serde_json::to_string(&ItemStatus::Skipped).unwrap();
        assert_eq!(item, "\"SKIPPED\"");
    }

    #[test]
    fn test_item_error_uses_stable_code() {
        let err = ExError::new(ExErrorKind::MissingDependency).with_message("needs dim_location");
        let item = ItemError::from_error("wide_sales_enriched", &err);
        assert_eq!(item.error_type, "ERR_MISSING_DEPENDENCY");
        assert_eq!(item.error_message, "needs dim_location");
    }
}
