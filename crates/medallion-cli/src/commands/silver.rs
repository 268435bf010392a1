//! Silver transform command

use clap::Args;
use medallion_core::errors::ExError;
use medallion_core::render::HtmlReportRenderer;
use medallion_engine::stages::run_silver;
use medallion_engine::PipelineConfig;

#[derive(Debug, Args)]
pub struct SilverArgs {
    /// Bronze run to transform; the latest when omitted
    pub parent_run_id: Option<String>,
}

pub fn execute(args: SilverArgs, cfg: &PipelineConfig) -> Result<i32, ExError> {
    let outcome = run_silver(cfg, args.parent_run_id.as_deref(), &HtmlReportRenderer)?;

    println!("Silver run complete:");
    println!("  run_id: {}", outcome.run_id);
    if let Some(parent) = &outcome.parent_run_id {
        println!("  bronze_run_id: {}", parent);
    }
    println!("  status: {}", outcome.status.as_str());
    println!("  manifest: {}", outcome.manifest_path.display());
    if outcome.errors > 0 {
        println!("  failed tables: {}", outcome.errors);
    }
    Ok(outcome.exit_code())
}
