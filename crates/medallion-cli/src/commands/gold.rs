//! Gold build command

use clap::Args;
use medallion_core::errors::ExError;
use medallion_core::render::HtmlReportRenderer;
use medallion_engine::stages::{run_gold, GoldRequest};
use medallion_engine::PipelineConfig;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct GoldArgs {
    /// Silver run to build from; the latest when omitted
    pub parent_run_id: Option<String>,

    /// JSON plan: {"mart_list": [...]}. Every mart is built without one.
    #[arg(long)]
    pub plan: Option<PathBuf>,
}

pub fn execute(args: GoldArgs, cfg: &PipelineConfig) -> Result<i32, ExError> {
    let request = match &args.plan {
        Some(path) => GoldRequest::with_plan_file(args.parent_run_id, path)?,
        None => GoldRequest {
            parent_run_id: args.parent_run_id,
            ..Default::default()
        },
    };
    let outcome = run_gold(cfg, &request, &HtmlReportRenderer)?;

    println!("Gold run complete:");
    println!("  run_id: {}", outcome.run_id);
    if let Some(parent) = &outcome.parent_run_id {
        println!("  silver_run_id: {}", parent);
    }
    println!("  status: {}", outcome.status.as_str());
    println!("  manifest: {}", outcome.manifest_path.display());
    if outcome.errors > 0 {
        println!("  errors: {}", outcome.errors);
    }
    Ok(outcome.exit_code())
}
