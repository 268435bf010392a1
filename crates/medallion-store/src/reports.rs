//! Report writing

#![allow(clippy::result_large_err)]

use crate::atomic::atomic_write;
use crate::errors::Result;
use crate::manifest_io::write_json;
use medallion_core::manifest::SummaryReport;
use medallion_core::render::render_summary_markdown;
use std::path::{Path, PathBuf};

pub const BRONZE_REPORT_FILE: &str = "elt_report.html";
pub const SILVER_REPORT_FILE: &str = "elt_report.html";
pub const GOLD_REPORT_FILE: &str = "gold_report.html";
pub const SUMMARY_JSON_FILE: &str = "summary_report.json";
pub const SUMMARY_MD_FILE: &str = "summary_report.md";

/// Write a rendered report document
pub fn write_report(path: &Path, body: &str) -> Result<()> {
    atomic_write(path, body.as_bytes())
}

/// Write `summary_report.json` and `summary_report.md` into `dir`.
///
/// Returns the two paths in that order.
pub fn write_summary(dir: &Path, report: &SummaryReport) -> Result<(PathBuf, PathBuf)> {
    let json_path = dir.join(SUMMARY_JSON_FILE);
    let md_path = dir.join(SUMMARY_MD_FILE);
    write_json(&json_path, report)?;
    write_report(&md_path, &render_summary_markdown(report))?;
    Ok((json_path, md_path))
}
