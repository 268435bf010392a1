//! Medallion Core - pure domain model of the Bronze/Silver/Gold pipeline
//!
//! This crate has no filesystem access. It provides:
//! - Run identity: parse, generate and derive `YYYYMMDD_HHMMSS_#suffix` ids
//! - An in-memory table model and value normalizers
//! - Silver per-table transforms
//! - The Gold mart catalog, plan and builders
//! - Manifest schemas for every layer and the summary report
//! - The orchestrator step state machine
//! - Report renderers and collaborator traits

pub mod collaborator;
pub mod digest;
pub mod errors;
pub mod gold;
pub mod logging_facility;
pub mod manifest;
pub mod normalize;
pub mod orchestration;
pub mod render;
pub mod run_id;
pub mod silver;
pub mod table;

// Re-export commonly used types
pub use collaborator::{NoopCollaborator, StageCollaborator, StageContext};
pub use errors::{ExError, ExErrorKind, PipelineError, Result};
pub use gold::{MartKind, MartPlan};
pub use manifest::{Layer, RunStatus};
pub use orchestration::{Orchestration, StepName, StepStatus};
pub use run_id::RunId;
pub use silver::SourceTable;
pub use table::Table;
