//! Subcommands and the root-path flags they share

pub mod bronze;
pub mod gold;
pub mod orchestrate;
pub mod silver;
pub mod summary;

use clap::Args;
use medallion_core::errors::ExError;
use medallion_engine::PipelineConfig;
use std::path::PathBuf;

/// Flags accepted by every subcommand. Each overrides the loaded config.
#[derive(Debug, Args)]
pub struct RootArgs {
    /// TOML configuration file layered over the built-in defaults
    #[arg(long, global = true, env = "PIPELINE_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, env = "RAW_CRM")]
    pub raw_crm: Option<PathBuf>,

    #[arg(long, global = true, env = "RAW_ERP")]
    pub raw_erp: Option<PathBuf>,

    #[arg(long, global = true, env = "BRONZE_ROOT")]
    pub bronze_root: Option<PathBuf>,

    #[arg(long, global = true, env = "SILVER_ROOT")]
    pub silver_root: Option<PathBuf>,

    #[arg(long, global = true, env = "GOLD_ROOT")]
    pub gold_root: Option<PathBuf>,

    #[arg(long, global = true, env = "REPORTS_ROOT")]
    pub reports_root: Option<PathBuf>,

    #[arg(long, global = true, env = "ORCHESTRATOR_ROOT")]
    pub orchestrator_root: Option<PathBuf>,

    /// development, production (JSON) or test
    #[arg(long, global = true, env = "LOG_PROFILE", default_value = "development")]
    pub log_profile: String,
}

impl RootArgs {
    pub fn load_config(&self) -> Result<PipelineConfig, ExError> {
        let mut cfg = PipelineConfig::load(self.config.as_deref())?;
        let overrides = [
            (&self.raw_crm, &mut cfg.crm.root),
            (&self.raw_erp, &mut cfg.erp.root),
            (&self.bronze_root, &mut cfg.bronze_root),
            (&self.silver_root, &mut cfg.silver_root),
            (&self.gold_root, &mut cfg.gold_root),
            (&self.reports_root, &mut cfg.reports_root),
            (&self.orchestrator_root, &mut cfg.orchestrator_root),
        ];
        for (flag, slot) in overrides {
            if let Some(path) = flag {
                *slot = path.clone();
            }
        }
        Ok(cfg)
    }
}
