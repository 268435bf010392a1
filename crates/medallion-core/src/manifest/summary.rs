use super::Layer;
use crate::orchestration::StepResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const STATUS_MISSING: &str = "missing";

/// Condensed view of one layer's manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerDigest {
    pub layer: Layer,
    #[serde(default)]
    pub run_id: Option<String>,
    /// Manifest status, or `missing` when no manifest was found
    pub status: String,
    #[serde(default)]
    pub started_utc: Option<String>,
    #[serde(default)]
    pub ended_utc: Option<String>,
    #[serde(default)]
    pub duration_s: Option<f64>,
    #[serde(default)]
    pub manifest_path: Option<String>,
    #[serde(default)]
    pub counts: BTreeMap<String, u64>,
    #[serde(default)]
    pub errors: usize,
}

impl LayerDigest {
    pub fn missing(layer: Layer, run_id: Option<String>) -> Self {
        Self {
            layer,
            run_id,
            status: STATUS_MISSING.to_string(),
            started_utc: None,
            ended_utc: None,
            duration_s: None,
            manifest_path: None,
            counts: BTreeMap::new(),
            errors: 0,
        }
    }

    pub fn is_missing(&self) -> bool {
        self.status == STATUS_MISSING
    }
}

/// Cross-layer report written at the end of an orchestrated run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryReport {
    #[serde(default)]
    pub orchestrator_run_id: Option<String>,
    pub generated_utc: String,
    pub status: String,
    #[serde(default)]
    pub steps: Vec<StepResult>,
    pub layers: Vec<LayerDigest>,
}

impl SummaryReport {
    pub fn layer(&self, layer: Layer) -> Option<&LayerDigest> {
        self.layers.iter().find(|l| l.layer == layer)
    }
}
