//! Canonical schema constants for structured logging and run events
//!
//! These constants keep the tracing output and the per-run `run_log.txt`
//! files consistent across layers.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";

pub const FIELD_RUN_ID: &str = "run_id";

// Error fields
pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";

// Run log event names (one line per event in run_log.txt)
pub const RUN_EVENT_START: &str = "RUN_START";
pub const RUN_EVENT_END: &str = "RUN_END";
pub const RUN_EVENT_SUCCESS: &str = "SUCCESS";
pub const RUN_EVENT_SKIPPED: &str = "SKIPPED";
pub const RUN_EVENT_ERROR: &str = "ERROR";
pub const RUN_EVENT_STATE: &str = "STATE";
