//! Medallion Engine - stage runners and orchestration
//!
//! Coordinates the pure domain logic in `medallion-core` with the
//! filesystem persistence in `medallion-store`:
//! - `config`: layered pipeline configuration
//! - `stages`: Bronze, Silver, Gold and Summary runners
//! - `orchestrator`: the end-to-end step pipeline

pub mod config;
pub mod orchestrator;
pub mod stages;

pub use config::{PipelineConfig, SourceSpec};
pub use orchestrator::{OrchestrateOptions, OrchestrationOutcome, Orchestrator};
pub use stages::StageOutcome;
