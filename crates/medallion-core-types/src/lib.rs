//! Core types shared across the medallion facilities
//!
//! Holds the canonical field keys and event names used by the logging
//! facility and the per-run logs, so every crate emits the same vocabulary.

pub mod schema;
