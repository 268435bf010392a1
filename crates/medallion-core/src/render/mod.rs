//! Human-readable reports
//!
//! Stages hand their finished manifest to a [`ReportRenderer`]; the store
//! writes whatever it returns under the run's `reports/` directory. The
//! default renderer emits a plain single-page HTML document.

pub mod html;
pub mod summary_md;

pub use html::HtmlReportRenderer;
pub use summary_md::render_summary_markdown;

use crate::manifest::{BronzeManifest, GoldManifest, SilverManifest};

/// Turn a finished manifest into a report document.
pub trait ReportRenderer: Send + Sync {
    fn render_bronze(&self, manifest: &BronzeManifest) -> String;
    fn render_silver(&self, manifest: &SilverManifest) -> String;
    fn render_gold(&self, manifest: &GoldManifest) -> String;
}
