//! YAML manifest persistence

#![allow(clippy::result_large_err)]

use crate::atomic::atomic_write;
use crate::errors::{io_error, json_error, yaml_error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Serialize `value` as YAML and write it atomically
pub fn write_yaml<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let text = serde_yaml::to_string(value)
        .map_err(|e| yaml_error("write_manifest", &path.display().to_string(), e))?;
    atomic_write(path, text.as_bytes())
}

pub fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path).map_err(|e| io_error("read_manifest", e))?;
    serde_yaml::from_str(&text)
        .map_err(|e| yaml_error("read_manifest", &path.display().to_string(), e))
}

/// Read a manifest if the file exists
pub fn read_yaml_opt<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    read_yaml(path).map(Some)
}

/// Serialize `value` as pretty JSON and write it atomically
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut text = serde_json::to_string_pretty(value).map_err(|e| json_error("write_json", e))?;
    text.push('\n');
    atomic_write(path, text.as_bytes())
}
