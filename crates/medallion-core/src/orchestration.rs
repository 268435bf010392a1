//! Orchestrator step model
//!
//! The step sequence is fixed. Each step goes `pending → running →
//! {success, failed}` or straight from `pending` to `skipped`. Whether a step
//! runs is decided from what happened upstream:
//!
//! 1. `summary` always runs
//! 2. after any failure, later steps are skipped with "prior failure"
//! 3. after Bronze finds no new data, later steps are skipped with "no new data"
//! 4. with drafting disabled, draft/build steps are skipped
//!
//! This module only tracks state. The engine runs the stages.

use crate::manifest::{duration_s, iso_utc, Layer};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepName {
    Bronze,
    SilverDraft,
    SilverBuild,
    SilverRun,
    GoldDraft,
    GoldBuild,
    GoldRun,
    Summary,
}

impl StepName {
    pub const SEQUENCE: [StepName; 8] = [
        StepName::Bronze,
        StepName::SilverDraft,
        StepName::SilverBuild,
        StepName::SilverRun,
        StepName::GoldDraft,
        StepName::GoldBuild,
        StepName::GoldRun,
        StepName::Summary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StepName::Bronze => "bronze",
            StepName::SilverDraft => "silver_draft",
            StepName::SilverBuild => "silver_build",
            StepName::SilverRun => "silver_run",
            StepName::GoldDraft => "gold_draft",
            StepName::GoldBuild => "gold_build",
            StepName::GoldRun => "gold_run",
            StepName::Summary => "summary",
        }
    }

    /// Draft/build steps are the ones an override may switch off
    pub fn is_drafting(&self) -> bool {
        matches!(
            self,
            StepName::SilverDraft | StepName::SilverBuild | StepName::GoldDraft | StepName::GoldBuild
        )
    }

    pub fn layer(&self) -> Option<Layer> {
        match self {
            StepName::Bronze => Some(Layer::Bronze),
            StepName::SilverDraft | StepName::SilverBuild | StepName::SilverRun => {
                Some(Layer::Silver)
            }
            StepName::GoldDraft | StepName::GoldBuild | StepName::GoldRun => Some(Layer::Gold),
            StepName::Summary => None,
        }
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Success,
    Failed,
    Skipped,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::Running => "running",
            StepStatus::Success => "success",
            StepStatus::Failed => "failed",
            StepStatus::Skipped => "skipped",
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, StepStatus::Success | StepStatus::Skipped)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoNewData,
    PriorFailure,
    DraftingDisabled,
}

impl SkipReason {
    pub fn message(&self) -> &'static str {
        match self {
            SkipReason::NoNewData => "no new data",
            SkipReason::PriorFailure => "prior failure",
            SkipReason::DraftingDisabled => "drafting disabled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub name: StepName,
    pub status: StepStatus,
    #[serde(default)]
    pub started_utc: Option<String>,
    #[serde(default)]
    pub ended_utc: Option<String>,
    #[serde(default)]
    pub duration_s: Option<f64>,
    #[serde(default)]
    pub return_code: Option<i32>,
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub log_path: Option<String>,
    #[serde(skip)]
    started_at: Option<DateTime<Utc>>,
}

impl StepResult {
    fn pending(name: StepName) -> Self {
        Self {
            name,
            status: StepStatus::Pending,
            started_utc: None,
            ended_utc: None,
            duration_s: None,
            return_code: None,
            run_id: None,
            details: None,
            log_path: None,
            started_at: None,
        }
    }
}

/// What the engine should do with the next step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAction {
    Run,
    Skip(SkipReason),
}

/// How a running step finished
#[derive(Debug, Clone, Default)]
pub struct StepCompletion {
    pub succeeded: bool,
    pub return_code: Option<i32>,
    pub run_id: Option<String>,
    pub details: Option<String>,
    pub log_path: Option<String>,
    /// Downstream steps should be skipped for this reason
    pub halt: Option<SkipReason>,
}

/// State of one orchestrated pipeline execution
#[derive(Debug, Clone)]
pub struct Orchestration {
    steps: Vec<StepResult>,
    skip_drafting: bool,
    halted: Option<SkipReason>,
}

impl Orchestration {
    pub fn new(skip_drafting: bool) -> Self {
        Self {
            steps: StepName::SEQUENCE
                .iter()
                .map(|s| StepResult::pending(*s))
                .collect(),
            skip_drafting,
            halted: None,
        }
    }

    /// Decide whether `step` runs given what has happened so far
    pub fn next_action(&self, step: StepName) -> StepAction {
        if step == StepName::Summary {
            return StepAction::Run;
        }
        if let Some(reason) = self.halted {
            return StepAction::Skip(reason);
        }
        if self.skip_drafting && step.is_drafting() {
            return StepAction::Skip(SkipReason::DraftingDisabled);
        }
        StepAction::Run
    }

    pub fn begin(&mut self, step: StepName, now: DateTime<Utc>) {
        let result = self.step_mut(step);
        result.status = StepStatus::Running;
        result.started_utc = Some(iso_utc(now));
        result.started_at = Some(now);
    }

    pub fn complete(&mut self, step: StepName, completion: StepCompletion, now: DateTime<Utc>) {
        let result = self.step_mut(step);
        result.status = if completion.succeeded {
            StepStatus::Success
        } else {
            StepStatus::Failed
        };
        result.ended_utc = Some(iso_utc(now));
        result.duration_s = result.started_at.map(|start| duration_s(start, now));
        result.return_code = completion.return_code;
        result.run_id = completion.run_id;
        result.details = completion.details;
        result.log_path = completion.log_path;

        if !completion.succeeded {
            self.halted = Some(SkipReason::PriorFailure);
        } else if completion.halt.is_some() && self.halted.is_none() {
            self.halted = completion.halt;
        }
    }

    pub fn skip(&mut self, step: StepName, reason: SkipReason) {
        let result = self.step_mut(step);
        result.status = StepStatus::Skipped;
        result.details = Some(reason.message().to_string());
    }

    pub fn step(&self, step: StepName) -> Option<&StepResult> {
        self.steps.iter().find(|s| s.name == step)
    }

    pub fn steps(&self) -> &[StepResult] {
        &self.steps
    }

    /// Success iff every step succeeded or was skipped
    pub fn succeeded(&self) -> bool {
        self.steps.iter().all(|s| s.status.is_ok())
    }

    pub fn exit_code(&self) -> i32 {
        if self.succeeded() {
            0
        } else {
            1
        }
    }

    fn step_mut(&mut self, step: StepName) -> &mut StepResult {
        let idx = StepName::SEQUENCE
            .iter()
            .position(|s| *s == step)
            .unwrap_or(0);
        &mut self.steps[idx]
    }
}
