//! Drafting and building collaborators for the Silver and Gold layers.
//!
//! The orchestrator calls `draft` then `build` before each layer's run step.
//! What they produce (transform specs, generated code, review notes) is
//! outside the pipeline; only their success or failure gates the next step.

use crate::errors::ExError;
use crate::manifest::Layer;
use std::path::PathBuf;

/// What a collaborator is told about the step it serves
#[derive(Debug, Clone)]
pub struct StageContext {
    pub layer: Layer,
    /// Run id of the upstream layer, when one is known
    pub upstream_run_id: Option<String>,
    /// Where the step's log file lives
    pub log_path: PathBuf,
}

/// Produce the artifacts a layer's run step relies on.
#[allow(clippy::result_large_err)]
pub trait StageCollaborator: Send + Sync {
    /// Draft the layer's transformation plan; returns a one-line detail.
    ///
    /// # Errors
    ///
    /// Returns an `ExError` when drafting fails. The orchestrator records the
    /// step as failed and skips everything downstream.
    fn draft(&self, ctx: &StageContext) -> Result<String, ExError>;

    /// Build the drafted plan into something the run step can execute.
    ///
    /// # Errors
    ///
    /// Same contract as [`StageCollaborator::draft`].
    fn build(&self, ctx: &StageContext) -> Result<String, ExError>;
}

/// Collaborator that does nothing and always succeeds.
/// Used when no drafting backend is configured.
pub struct NoopCollaborator;

impl StageCollaborator for NoopCollaborator {
    #[allow(clippy::result_large_err)]
    fn draft(&self, ctx: &StageContext) -> Result<String, ExError> {
        Ok(format!("no drafting backend for {}", ctx.layer))
    }

    #[allow(clippy::result_large_err)]
    fn build(&self, ctx: &StageContext) -> Result<String, ExError> {
        Ok(format!("no build backend for {}", ctx.layer))
    }
}
