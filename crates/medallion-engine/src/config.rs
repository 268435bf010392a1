//! Pipeline configuration
//!
//! Layered with the `config` crate, later sources winning:
//!
//! 1. built-in defaults (everything under `./artifacts`, raw data under `./raw`)
//! 2. an optional config file (format from its extension, usually TOML)
//! 3. `MEDALLION_*` environment variables, `__` between nested keys
//!    (`MEDALLION_CRM__ROOT`, `MEDALLION_RETRY__BACKOFF_BASE_MS`)
//!
//! The CLI applies its own flags on top of the loaded value. Every stage
//! takes the resulting [`PipelineConfig`] explicitly.

#![allow(clippy::result_large_err)]

use medallion_core::errors::{ExError, PipelineError};
use medallion_store::layout::gold_marts_root;
use medallion_store::retry::{RetryPolicy, DEFAULT_BACKOFF_BASE_MS, DEFAULT_MAX_ATTEMPTS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "MEDALLION";
pub const DEFAULT_INCLUDE_GLOB: &str = "*.csv";

fn default_include_glob() -> String {
    DEFAULT_INCLUDE_GLOB.to_string()
}

/// One raw source system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    /// Tag recorded against every file from this system
    pub system: String,
    pub root: PathBuf,
    #[serde(default = "default_include_glob")]
    pub include_glob: String,
    #[serde(default)]
    pub exclude_glob: Option<String>,
    /// Files that must be ingested even if the glob does not find them
    #[serde(default)]
    pub files: Vec<String>,
}

impl SourceSpec {
    pub fn new(system: &str, root: impl Into<PathBuf>) -> Self {
        Self {
            system: system.to_string(),
            root: root.into(),
            include_glob: default_include_glob(),
            exclude_glob: None,
            files: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub crm: SourceSpec,
    pub erp: SourceSpec,
    pub bronze_root: PathBuf,
    pub silver_root: PathBuf,
    pub gold_root: PathBuf,
    pub reports_root: PathBuf,
    pub orchestrator_root: PathBuf,
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl PipelineConfig {
    /// Load defaults, then `file` if given, then the environment.
    ///
    /// # Errors
    ///
    /// Returns a config error if the file cannot be parsed or a value has
    /// the wrong type.
    pub fn load(file: Option<&Path>) -> Result<Self, ExError> {
        let mut builder = config::Config::builder();
        for (key, value) in default_entries() {
            builder = builder.set_default(key, value).map_err(config_error)?;
        }
        for (key, value) in [
            ("retry.max_attempts", i64::from(DEFAULT_MAX_ATTEMPTS)),
            ("retry.backoff_base_ms", DEFAULT_BACKOFF_BASE_MS as i64),
        ] {
            builder = builder.set_default(key, value).map_err(config_error)?;
        }
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(config_error)
    }

    /// Configuration rooted in one directory, for tests and local runs.
    ///
    /// Raw data is expected in `<base>/raw/{crm,erp}`; artifacts go to
    /// `<base>/artifacts/*`. Retries do not sleep.
    pub fn with_base(base: &Path) -> Self {
        let artifacts = base.join("artifacts");
        Self {
            crm: SourceSpec::new("CRM", base.join("raw").join("crm")),
            erp: SourceSpec::new("ERP", base.join("raw").join("erp")),
            bronze_root: artifacts.join("bronze"),
            silver_root: artifacts.join("silver"),
            gold_root: artifacts.join("gold"),
            reports_root: artifacts.join("reports"),
            orchestrator_root: artifacts.join("orchestrator"),
            retry: RetryPolicy::immediate(DEFAULT_MAX_ATTEMPTS),
        }
    }

    /// Source systems in processing order
    pub fn sources(&self) -> [&SourceSpec; 2] {
        [&self.crm, &self.erp]
    }

    /// Directory Gold run directories are created under
    pub fn gold_marts_root(&self) -> PathBuf {
        gold_marts_root(&self.gold_root)
    }

    /// Fail fast when a raw source root is missing
    ///
    /// # Errors
    ///
    /// Returns the first missing root as `PipelineError::SourceRootMissing`.
    pub fn validate_sources(&self) -> Result<(), ExError> {
        for source in self.sources() {
            if !source.root.is_dir() {
                return Err(PipelineError::SourceRootMissing {
                    source_system: source.system.clone(),
                    path: source.root.display().to_string(),
                }
                .into());
            }
        }
        Ok(())
    }
}

fn default_entries() -> [(&'static str, &'static str); 11] {
    [
        ("crm.system", "CRM"),
        ("crm.root", "raw/crm"),
        ("crm.include_glob", DEFAULT_INCLUDE_GLOB),
        ("erp.system", "ERP"),
        ("erp.root", "raw/erp"),
        ("erp.include_glob", DEFAULT_INCLUDE_GLOB),
        ("bronze_root", "artifacts/bronze"),
        ("silver_root", "artifacts/silver"),
        ("gold_root", "artifacts/gold"),
        ("reports_root", "artifacts/reports"),
        ("orchestrator_root", "artifacts/orchestrator"),
    ]
}

fn config_error(err: config::ConfigError) -> ExError {
    ExError::from(PipelineError::Config {
        reason: err.to_string(),
    })
    .with_op("load_config")
}

#[cfg(test)]
mod tests {
    use super::*;
    use medallion_core::errors::ExErrorKind;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_file() {
        let cfg = PipelineConfig::load(None).unwrap();
        assert_eq!(cfg.crm.system, "CRM");
        assert_eq!(cfg.erp.include_glob, "*.csv");
        assert_eq!(cfg.retry.max_attempts, 3);
        assert_eq!(cfg.gold_marts_root(), cfg.gold_root.join("marts"));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("medallion.toml");
        std::fs::write(
            &path,
            r#"
bronze_root = "/data/bronze"

[crm]
root = "/landing/crm"
exclude_glob = "*_old.csv"
files = ["cst_info.csv"]

[retry]
backoff_base_ms = 5
"#,
        )
        .unwrap();

        let cfg = PipelineConfig::load(Some(&path)).unwrap();
        assert_eq!(cfg.bronze_root, PathBuf::from("/data/bronze"));
        assert_eq!(cfg.crm.root, PathBuf::from("/landing/crm"));
        assert_eq!(cfg.crm.exclude_glob.as_deref(), Some("*_old.csv"));
        assert_eq!(cfg.crm.files, vec!["cst_info.csv".to_string()]);
        assert_eq!(cfg.retry.backoff_base_ms, 5);
        assert_eq!(cfg.retry.max_attempts, 3);
    }

    #[test]
    fn test_missing_explicit_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let err = PipelineConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Config);
    }

    #[test]
    fn test_validate_sources_reports_missing_root() {
        let dir = TempDir::new().unwrap();
        let cfg = PipelineConfig::with_base(dir.path());
        let err = cfg.validate_sources().unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Config);
        assert_eq!(err.item(), Some("CRM"));

        std::fs::create_dir_all(&cfg.crm.root).unwrap();
        std::fs::create_dir_all(&cfg.erp.root).unwrap();
        assert!(cfg.validate_sources().is_ok());
    }
}
