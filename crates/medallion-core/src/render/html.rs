use super::ReportRenderer;
use crate::manifest::{BronzeManifest, GoldManifest, ItemError, RunInfo, SilverManifest};

/// Minimal HTML report: run header, one table of items, errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlReportRenderer;

impl ReportRenderer for HtmlReportRenderer {
    fn render_bronze(&self, manifest: &BronzeManifest) -> String {
        let mut output = String::new();
        open_document(&mut output, "Bronze ingestion report", &manifest.run);

        let s = &manifest.summary;
        output.push_str("<h2>Summary</h2>\n<ul>\n");
        output.push_str(&format!("<li>Files: {}</li>\n", s.files_total));
        output.push_str(&format!(
            "<li>Copied: {} / Skipped: {} / Failed: {}</li>\n",
            s.files_success, s.files_skipped, s.files_failed
        ));
        output.push_str(&format!("<li>Rows copied: {}</li>\n", s.rows_total));
        output.push_str(&format!("<li>New data: {}</li>\n", yes_no(s.has_new_data)));
        output.push_str("</ul>\n");

        output.push_str("<h2>Files</h2>\n<table>\n");
        table_header(&mut output, &["File", "Source", "Status", "Rows", "Reason"]);
        for record in &manifest.files {
            table_row(
                &mut output,
                &[
                    record.file.clone(),
                    record.source_system.clone(),
                    format!("{:?}", record.status).to_uppercase(),
                    opt(record.rows),
                    record
                        .skip_reason
                        .clone()
                        .or_else(|| record.error_message.clone())
                        .unwrap_or_default(),
                ],
            );
        }
        output.push_str("</table>\n");

        errors_section(&mut output, &manifest.errors);
        close_document(&mut output);
        output
    }

    fn render_silver(&self, manifest: &SilverManifest) -> String {
        let mut output = String::new();
        open_document(&mut output, "Silver transform report", &manifest.run);

        output.push_str(&format!(
            "<p>Source: Bronze run <code>{}</code></p>\n",
            escape(&manifest.source.bronze_run_id)
        ));

        output.push_str("<h2>Tables</h2>\n<table>\n");
        table_header(&mut output, &["Table", "Status", "Rows in", "Rows out", "Seconds"]);
        for entry in &manifest.tables {
            table_row(
                &mut output,
                &[
                    entry.table.clone(),
                    format!("{:?}", entry.status).to_uppercase(),
                    opt(entry.rows_in),
                    opt(entry.rows_out),
                    format!("{:.3}", entry.duration_s),
                ],
            );
        }
        output.push_str("</table>\n");

        errors_section(&mut output, &manifest.errors);
        close_document(&mut output);
        output
    }

    fn render_gold(&self, manifest: &GoldManifest) -> String {
        let mut output = String::new();
        open_document(&mut output, "Gold marts report", &manifest.run);

        output.push_str(&format!(
            "<p>Source: Silver run <code>{}</code></p>\n",
            escape(&manifest.source.silver_run_id)
        ));

        output.push_str("<h2>Outputs</h2>\n<table>\n");
        table_header(&mut output, &["Mart", "Category", "Rows", "Columns"]);
        for mart in &manifest.outputs {
            table_row(
                &mut output,
                &[
                    mart.name.clone(),
                    format!("{:?}", mart.category).to_lowercase(),
                    mart.rows.to_string(),
                    mart.columns.len().to_string(),
                ],
            );
        }
        output.push_str("</table>\n");

        if !manifest.skipped.is_empty() {
            output.push_str("<h2>Skipped</h2>\n<ul>\n");
            for skipped in &manifest.skipped {
                output.push_str(&format!(
                    "<li>{}: {}</li>\n",
                    escape(&skipped.name),
                    escape(&skipped.reason)
                ));
            }
            output.push_str("</ul>\n");
        }

        errors_section(&mut output, &manifest.errors);
        close_document(&mut output);
        output
    }
}

fn open_document(output: &mut String, title: &str, run: &RunInfo) {
    output.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    output.push_str(&format!("<title>{}</title>\n", escape(title)));
    output.push_str("</head>\n<body>\n");
    output.push_str(&format!("<h1>{}</h1>\n", escape(title)));
    output.push_str("<dl>\n");
    output.push_str(&format!("<dt>Run</dt><dd>{}</dd>\n", escape(&run.run_id)));
    if let Some(parent) = &run.parent_run_id {
        output.push_str(&format!("<dt>Parent</dt><dd>{}</dd>\n", escape(parent)));
    }
    output.push_str(&format!("<dt>Status</dt><dd>{}</dd>\n", run.status.as_str()));
    output.push_str(&format!(
        "<dt>Started</dt><dd>{}</dd>\n<dt>Ended</dt><dd>{}</dd>\n",
        escape(&run.started_utc),
        escape(&run.ended_utc)
    ));
    output.push_str(&format!("<dt>Duration</dt><dd>{:.3}s</dd>\n", run.duration_s));
    output.push_str("</dl>\n");
}

fn close_document(output: &mut String) {
    output.push_str("</body>\n</html>\n");
}

fn errors_section(output: &mut String, errors: &[ItemError]) {
    if errors.is_empty() {
        return;
    }
    output.push_str("<h2>Errors</h2>\n<table>\n");
    table_header(output, &["Item", "Type", "Message"]);
    for err in errors {
        table_row(
            output,
            &[
                err.item.clone(),
                err.error_type.clone(),
                err.error_message.clone(),
            ],
        );
    }
    output.push_str("</table>\n");
}

fn table_header(output: &mut String, cells: &[&str]) {
    output.push_str("<tr>");
    for cell in cells {
        output.push_str(&format!("<th>{}</th>", escape(cell)));
    }
    output.push_str("</tr>\n");
}

fn table_row(output: &mut String, cells: &[String]) {
    output.push_str("<tr>");
    for cell in cells {
        output.push_str(&format!("<td>{}</td>", escape(cell)));
    }
    output.push_str("</tr>\n");
}

fn opt(value: Option<usize>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
