//! Bronze ingestion state
//!
//! A single YAML document mapping absolute source paths to the fingerprint
//! last ingested successfully. It is only ever replaced as a whole, and only
//! after a run with no failed files.

#![allow(clippy::result_large_err)]

use crate::errors::Result;
use crate::fingerprint::FileFingerprint;
use crate::manifest_io::{read_yaml_opt, write_yaml};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateEntry {
    pub source_system: String,
    pub mtime_utc: String,
    pub sha256: String,
    pub size_bytes: u64,
}

impl StateEntry {
    pub fn new(source_system: &str, fp: &FileFingerprint) -> Self {
        Self {
            source_system: source_system.to_string(),
            mtime_utc: fp.mtime_utc.clone(),
            sha256: fp.sha256.clone(),
            size_bytes: fp.size_bytes,
        }
    }

    /// Whether `current` differs from what was last ingested.
    ///
    /// Size is recorded but not compared; a size change always changes the hash.
    pub fn is_changed(&self, current: &FileFingerprint) -> bool {
        self.mtime_utc != current.mtime_utc || self.sha256 != current.sha256
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionState {
    #[serde(default)]
    pub updated_utc: Option<String>,
    #[serde(default)]
    pub files: BTreeMap<String, StateEntry>,
}

impl IngestionState {
    /// Load the state; a missing file is an empty state
    pub fn load(path: &Path) -> Result<Self> {
        Ok(read_yaml_opt(path)?.unwrap_or_default())
    }

    /// Replace the state document atomically
    pub fn save(&self, path: &Path) -> Result<()> {
        write_yaml(path, self)
    }

    pub fn get(&self, source_path: &str) -> Option<&StateEntry> {
        self.files.get(source_path)
    }

    /// A file is changed when it has no previous entry or its entry differs
    pub fn is_changed(&self, source_path: &str, current: &FileFingerprint) -> bool {
        self.get(source_path)
            .map(|prev| prev.is_changed(current))
            .unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fp(mtime: &str, sha: &str) -> FileFingerprint {
        FileFingerprint {
            mtime_utc: mtime.to_string(),
            sha256: sha.to_string(),
            size_bytes: 10,
        }
    }

    #[test]
    fn test_absent_state_loads_empty() {
        let dir = TempDir::new().unwrap();
        let state = IngestionState::load(&dir.path().join("_state/last_ingested.yaml")).unwrap();
        assert!(state.files.is_empty());
        assert!(state.is_changed("/raw/crm/a.csv", &fp("t1", "h1")));
    }

    #[test]
    fn test_change_detection() {
        let mut state = IngestionState::default();
        state.files.insert(
            "/raw/crm/a.csv".to_string(),
            StateEntry::new("crm", &fp("t1", "h1")),
        );

        assert!(!state.is_changed("/raw/crm/a.csv", &fp("t1", "h1")));
        assert!(state.is_changed("/raw/crm/a.csv", &fp("t2", "h1")));
        assert!(state.is_changed("/raw/crm/a.csv", &fp("t1", "h2")));
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("_state").join("last_ingested.yaml");
        let mut state = IngestionState {
            updated_utc: Some("2024-01-02T03:04:05Z".to_string()),
            ..Default::default()
        };
        state.files.insert(
            "/raw/erp/LOC_A101.csv".to_string(),
            StateEntry::new("erp", &fp("t1", "h1")),
        );

        state.save(&path).unwrap();
        assert_eq!(IngestionState::load(&path).unwrap(), state);
    }
}
