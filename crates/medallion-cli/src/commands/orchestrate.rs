//! End-to-end orchestration command

use clap::Args;
use medallion_core::collaborator::NoopCollaborator;
use medallion_core::errors::ExError;
use medallion_core::render::HtmlReportRenderer;
use medallion_engine::stages::GoldRequest;
use medallion_engine::{OrchestrateOptions, Orchestrator, PipelineConfig};
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct OrchestrateArgs {
    /// Skip the draft and build steps of Silver and Gold
    #[arg(long)]
    pub skip_drafting: bool,

    /// JSON mart plan handed to the Gold step
    #[arg(long)]
    pub plan: Option<PathBuf>,
}

pub fn execute(args: OrchestrateArgs, cfg: &PipelineConfig) -> Result<i32, ExError> {
    let plan = match &args.plan {
        Some(path) => GoldRequest::with_plan_file(None, path)?.plan,
        None => Default::default(),
    };
    let options = OrchestrateOptions {
        skip_drafting: args.skip_drafting,
        plan,
    };

    let outcome = Orchestrator::new(cfg, &NoopCollaborator, &HtmlReportRenderer).run(&options)?;

    println!("Orchestration complete:");
    println!("  run_id: {}", outcome.run_id);
    for step in &outcome.steps {
        println!(
            "  {:<13} {:<8} {}",
            step.name.as_str(),
            step.status.as_str(),
            step.details.as_deref().unwrap_or("")
        );
    }
    if let Some(path) = &outcome.summary_json {
        println!("  summary: {}", path.display());
    }
    Ok(outcome.exit_code)
}
