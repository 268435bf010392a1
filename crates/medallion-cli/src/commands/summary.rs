//! Summary report command

use clap::Args;
use medallion_core::errors::ExError;
use medallion_engine::stages::{run_summary, SummaryRequest};
use medallion_engine::PipelineConfig;

#[derive(Debug, Args)]
pub struct SummaryArgs {
    /// Bronze run to report; the latest when omitted
    #[arg(long)]
    pub bronze_run_id: Option<String>,

    #[arg(long)]
    pub silver_run_id: Option<String>,

    #[arg(long)]
    pub gold_run_id: Option<String>,
}

pub fn execute(args: SummaryArgs, cfg: &PipelineConfig) -> Result<i32, ExError> {
    let request = SummaryRequest {
        bronze_run_id: args.bronze_run_id,
        silver_run_id: args.silver_run_id,
        gold_run_id: args.gold_run_id,
        ..Default::default()
    };
    let outcome = run_summary(cfg, &request)?;

    println!("Summary written:");
    println!("  status: {}", outcome.report.status);
    for layer in &outcome.report.layers {
        println!(
            "  {:<7} {:<8} {}",
            layer.layer.as_str(),
            layer.status,
            layer.run_id.as_deref().unwrap_or("-")
        );
    }
    println!("  json: {}", outcome.json_path.display());
    println!("  markdown: {}", outcome.markdown_path.display());
    Ok(0)
}
