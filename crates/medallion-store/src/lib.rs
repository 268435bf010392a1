//! Medallion Store - filesystem persistence for pipeline runs
//!
//! Provides:
//! - Atomic write-rename primitive used for every artifact
//! - Bounded retry for transient IO
//! - Streaming file fingerprints (mtime, SHA-256, size)
//! - CSV reading/writing for the table model
//! - Run directory layout and latest-run resolution
//! - Append-only run logs, YAML manifests and the ingestion state document
//! - Report writing

pub mod atomic;
pub mod csv_io;
pub mod errors;
pub mod fingerprint;
pub mod layout;
pub mod manifest_io;
pub mod reports;
pub mod retry;
pub mod run_log;
pub mod state;

// Re-export key types
pub use atomic::{atomic_write, atomic_write_with};
pub use errors::Result;
pub use fingerprint::FileFingerprint;
pub use layout::RunLayout;
pub use retry::RetryPolicy;
pub use run_log::RunLog;
pub use state::IngestionState;
