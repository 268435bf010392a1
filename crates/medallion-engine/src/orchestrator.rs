//! End-to-end orchestration
//!
//! ## Step pipeline (in order):
//! 1. Pre-flight: raw source roots must exist (hard stop, no artifacts)
//! 2. `bronze`
//! 3. `silver_draft`, `silver_build` (collaborator), `silver_run`
//! 4. `gold_draft`, `gold_build` (collaborator), `gold_run`
//! 5. `summary` (always runs)
//!
//! Gating is owned by [`Orchestration`]. A stage that returns PARTIAL counts
//! as a failed step. Every step gets a log file under
//! `<orchestrator_root>/<id>/logs/<step>.log`.

#![allow(clippy::result_large_err)]

use crate::config::PipelineConfig;
use crate::stages::{
    run_bronze, run_gold, run_silver, run_summary, GoldRequest, StageOutcome, SummaryRequest,
};
use chrono::Utc;
use medallion_core::collaborator::{StageCollaborator, StageContext};
use medallion_core::errors::ExError;
use medallion_core::gold::MartPlan;
use medallion_core::manifest::{Layer, RunStatus};
use medallion_core::orchestration::{
    Orchestration, SkipReason, StepAction, StepCompletion, StepName, StepResult,
};
use medallion_core::render::ReportRenderer;
use medallion_core::run_id::RunId;
use medallion_core::{log_op_end, log_op_start};
use medallion_store::errors::{io_error, Result};
use medallion_store::RunLog;
use std::path::PathBuf;
use std::time::Instant;

pub const LOGS_DIR: &str = "logs";

/// Options for one orchestrated run
#[derive(Debug, Clone, Default)]
pub struct OrchestrateOptions {
    /// Skip the draft/build steps; run steps still execute
    pub skip_drafting: bool,
    pub plan: MartPlan,
}

/// Result of an orchestrated run
#[derive(Debug, Clone)]
pub struct OrchestrationOutcome {
    pub run_id: String,
    pub steps: Vec<StepResult>,
    pub summary_json: Option<PathBuf>,
    pub exit_code: i32,
}

pub struct Orchestrator<'a> {
    cfg: &'a PipelineConfig,
    collaborator: &'a dyn StageCollaborator,
    renderer: &'a dyn ReportRenderer,
}

/// Run ids handed from one layer to the next
#[derive(Default)]
struct Lineage {
    bronze: Option<String>,
    silver: Option<String>,
    gold: Option<String>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        cfg: &'a PipelineConfig,
        collaborator: &'a dyn StageCollaborator,
        renderer: &'a dyn ReportRenderer,
    ) -> Self {
        Self {
            cfg,
            collaborator,
            renderer,
        }
    }

    /// Run every step.
    ///
    /// # Errors
    ///
    /// Fatal only: a missing raw source root (checked before anything is
    /// created) or a failure to create the orchestrator's log directory.
    /// Step failures are reported in the outcome.
    pub fn run(&self, options: &OrchestrateOptions) -> Result<OrchestrationOutcome> {
        let timer = Instant::now();
        self.cfg.validate_sources()?;

        let run_id = RunId::generate(Utc::now()).to_string();
        log_op_start!("orchestrate", run_id = %run_id);
        let logs_dir = self.cfg.orchestrator_root.join(&run_id).join(LOGS_DIR);
        std::fs::create_dir_all(&logs_dir).map_err(|e| io_error("create_orchestrator_dir", e))?;

        let mut orch = Orchestration::new(options.skip_drafting);
        let mut lineage = Lineage::default();
        let mut summary_json = None;

        for step in StepName::SEQUENCE {
            let log_path = logs_dir.join(format!("{}.log", step.as_str()));
            let mut step_log = RunLog::new(&log_path, &run_id);

            if let StepAction::Skip(reason) = orch.next_action(step) {
                step_log.append(
                    "STEP_SKIPPED",
                    &[
                        ("step", step.as_str().to_string()),
                        ("reason", reason.message().to_string()),
                    ],
                )?;
                orch.skip(step, reason);
                continue;
            }

            orch.begin(step, Utc::now());
            step_log.append("STEP_START", &[("step", step.as_str().to_string())])?;

            let mut completion = match step {
                StepName::Bronze => {
                    let result = run_bronze(self.cfg, self.renderer);
                    if let Ok(outcome) = &result {
                        lineage.bronze = Some(outcome.run_id.clone());
                    }
                    stage_completion(&result)
                }
                StepName::SilverRun => {
                    let result = run_silver(self.cfg, lineage.bronze.as_deref(), self.renderer);
                    if let Ok(outcome) = &result {
                        lineage.silver = Some(outcome.run_id.clone());
                    }
                    stage_completion(&result)
                }
                StepName::GoldRun => {
                    let request = GoldRequest {
                        parent_run_id: lineage.silver.clone(),
                        plan: options.plan.clone(),
                    };
                    let result = run_gold(self.cfg, &request, self.renderer);
                    if let Ok(outcome) = &result {
                        lineage.gold = Some(outcome.run_id.clone());
                    }
                    stage_completion(&result)
                }
                StepName::SilverDraft
                | StepName::SilverBuild
                | StepName::GoldDraft
                | StepName::GoldBuild => self.collaborate(step, &lineage, log_path.clone()),
                StepName::Summary => {
                    let request = SummaryRequest {
                        orchestrator_run_id: Some(run_id.clone()),
                        bronze_run_id: lineage.bronze.clone(),
                        silver_run_id: lineage.silver.clone(),
                        gold_run_id: lineage.gold.clone(),
                        steps: orch
                            .steps()
                            .iter()
                            .filter(|s| s.name != StepName::Summary)
                            .cloned()
                            .collect(),
                    };
                    match run_summary(self.cfg, &request) {
                        Ok(outcome) => {
                            summary_json = Some(outcome.json_path.clone());
                            StepCompletion {
                                succeeded: true,
                                return_code: Some(0),
                                run_id: Some(outcome.report_id),
                                details: Some(outcome.report.status),
                                ..Default::default()
                            }
                        }
                        Err(err) => failed_completion(&err),
                    }
                }
            };
            completion.log_path = Some(log_path.display().to_string());

            step_log.append(
                "STEP_END",
                &[
                    ("step", step.as_str().to_string()),
                    (
                        "status",
                        if completion.succeeded { "success" } else { "failed" }.to_string(),
                    ),
                    ("details", completion.details.clone().unwrap_or_default()),
                ],
            )?;
            orch.complete(step, completion, Utc::now());
        }

        let exit_code = orch.exit_code();
        log_op_end!(
            "orchestrate",
            duration_ms = timer.elapsed().as_millis() as u64,
            run_id = %run_id,
            exit_code = exit_code
        );
        Ok(OrchestrationOutcome {
            run_id,
            steps: orch.steps().to_vec(),
            summary_json,
            exit_code,
        })
    }

    fn collaborate(&self, step: StepName, lineage: &Lineage, log_path: PathBuf) -> StepCompletion {
        let layer = step.layer().unwrap_or(Layer::Silver);
        let upstream_run_id = match layer {
            Layer::Gold => lineage.silver.clone(),
            _ => lineage.bronze.clone(),
        };
        let ctx = StageContext {
            layer,
            upstream_run_id,
            log_path,
        };
        let result = match step {
            StepName::SilverDraft | StepName::GoldDraft => self.collaborator.draft(&ctx),
            _ => self.collaborator.build(&ctx),
        };
        match result {
            Ok(details) => StepCompletion {
                succeeded: true,
                return_code: Some(0),
                details: Some(details),
                ..Default::default()
            },
            Err(err) => failed_completion(&err),
        }
    }
}

/// A stage step succeeds only on SUCCESS. Bronze with nothing new halts
/// the layers below it.
fn stage_completion(result: &Result<StageOutcome>) -> StepCompletion {
    match result {
        Ok(outcome) => {
            let succeeded = outcome.status == RunStatus::Success;
            let halt = (succeeded && outcome.no_new_data).then_some(SkipReason::NoNewData);
            StepCompletion {
                succeeded,
                return_code: Some(outcome.exit_code()),
                run_id: Some(outcome.run_id.clone()),
                details: Some(match outcome.errors {
                    0 => outcome.status.as_str().to_string(),
                    n => format!("{} ({} errors)", outcome.status.as_str(), n),
                }),
                halt,
                ..Default::default()
            }
        }
        Err(err) => failed_completion(err),
    }
}

fn failed_completion(err: &ExError) -> StepCompletion {
    StepCompletion {
        succeeded: false,
        return_code: Some(RunStatus::Failed.exit_code()),
        details: Some(err.to_string()),
        ..Default::default()
    }
}
