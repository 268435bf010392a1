use crate::manifest::SummaryReport;

/// Render the cross-layer summary as Markdown
pub fn render_summary_markdown(report: &SummaryReport) -> String {
    let mut output = String::new();

    output.push_str("# Pipeline Summary\n\n");
    if let Some(id) = &report.orchestrator_run_id {
        output.push_str(&format!("- Orchestrator run: `{}`\n", id));
    }
    output.push_str(&format!("- Generated: {}\n", report.generated_utc));
    output.push_str(&format!("- Status: **{}**\n\n", report.status));

    if !report.steps.is_empty() {
        output.push_str("## Steps\n\n");
        output.push_str("| Step | Status | Duration (s) | Details |\n");
        output.push_str("|------|--------|--------------|---------|\n");
        for step in &report.steps {
            output.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                step.name,
                step.status.as_str(),
                step.duration_s
                    .map(|d| format!("{:.3}", d))
                    .unwrap_or_else(|| "-".to_string()),
                step.details.as_deref().unwrap_or("").replace('|', "\\|"),
            ));
        }
        output.push('\n');
    }

    output.push_str("## Layers\n\n");
    for digest in &report.layers {
        output.push_str(&format!("### {}\n\n", digest.layer));
        output.push_str(&format!(
            "- Run: {}\n",
            digest.run_id.as_deref().unwrap_or("-")
        ));
        output.push_str(&format!("- Status: {}\n", digest.status));
        if digest.is_missing() {
            output.push('\n');
            continue;
        }
        if let (Some(start), Some(end)) = (&digest.started_utc, &digest.ended_utc) {
            output.push_str(&format!("- Window: {} to {}\n", start, end));
        }
        if let Some(path) = &digest.manifest_path {
            output.push_str(&format!("- Manifest: `{}`\n", path));
        }
        for (key, value) in &digest.counts {
            output.push_str(&format!("- {}: {}\n", key, value));
        }
        output.push_str(&format!("- Errors: {}\n\n", digest.errors));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{Layer, LayerDigest};
    use crate::orchestration::Orchestration;

    #[test]
    fn test_missing_layers_are_marked() {
        let report = SummaryReport {
            orchestrator_run_id: Some("20240304_050607_#abcdef12".to_string()),
            generated_utc: "2024-03-04T05:06:07Z".to_string(),
            status: "failed".to_string(),
            steps: Orchestration::new(false).steps().to_vec(),
            layers: vec![
                LayerDigest::missing(Layer::Bronze, None),
                LayerDigest::missing(Layer::Silver, None),
            ],
        };
        let md = render_summary_markdown(&report);
        assert!(md.starts_with("# Pipeline Summary"));
        assert!(md.contains("### bronze"));
        assert!(md.contains("- Status: missing"));
        assert!(md.contains("| silver_draft | pending |"));
    }
}
