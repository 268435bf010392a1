//! Per-run human-readable log
//!
//! One line per event: `<iso-utc> | <EVENT> key=value ...`. The file is
//! rewritten through the atomic writer after every append, so a reader
//! never sees a torn line.

#![allow(clippy::result_large_err)]

use crate::atomic::atomic_write;
use crate::errors::Result;
use chrono::{SecondsFormat, Utc};
use std::path::{Path, PathBuf};

pub struct RunLog {
    path: PathBuf,
    run_id: String,
    lines: Vec<String>,
}

impl RunLog {
    pub fn new(path: impl Into<PathBuf>, run_id: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            run_id: run_id.into(),
            lines: Vec::new(),
        }
    }

    /// Append one event line and persist the log
    pub fn append(&mut self, event: &str, fields: &[(&str, String)]) -> Result<()> {
        let mut line = format!(
            "{} | {}",
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            event
        );
        for (key, value) in fields {
            line.push_str(&format!(" {}={}", key, value));
        }

        tracing::info!(
            run_id = %self.run_id,
            run_event = event,
            "{}",
            line.split_once(" | ").map(|(_, rest)| rest).unwrap_or(&line)
        );

        self.lines.push(line);
        let mut content = self.lines.join("\n");
        content.push('\n');
        atomic_write(&self.path, content.as_bytes())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medallion_core_types::schema::{RUN_EVENT_END, RUN_EVENT_START};
    use tempfile::TempDir;

    #[test]
    fn test_lines_are_persisted_in_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("run_log.txt");
        let mut log = RunLog::new(&path, "20240102_030405_#abcdef12");

        log.append(
            RUN_EVENT_START,
            &[("run_id", "20240102_030405_#abcdef12".to_string())],
        )
        .unwrap();
        log.append(RUN_EVENT_END, &[("status", "SUCCESS".to_string())])
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains(" | RUN_START run_id=20240102_030405_#abcdef12"));
        assert!(lines[1].ends_with("| RUN_END status=SUCCESS"));
        assert!(lines[0].split(" | ").next().unwrap().ends_with('Z'));
    }
}
