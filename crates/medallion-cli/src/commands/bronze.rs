//! Bronze ingestion command

use medallion_core::errors::ExError;
use medallion_core::render::HtmlReportRenderer;
use medallion_engine::stages::run_bronze;
use medallion_engine::PipelineConfig;

pub fn execute(cfg: &PipelineConfig) -> Result<i32, ExError> {
    let outcome = run_bronze(cfg, &HtmlReportRenderer)?;

    println!("Bronze run complete:");
    println!("  run_id: {}", outcome.run_id);
    println!("  status: {}", outcome.status.as_str());
    println!("  manifest: {}", outcome.manifest_path.display());
    if outcome.no_new_data {
        println!("  (no new data)");
    }
    if outcome.errors > 0 {
        println!("  failed files: {}", outcome.errors);
    }
    Ok(outcome.exit_code())
}
