//! Report rendering.
//!
//! This module renders an evaluation run as pretty JSON (the stable
//! machine-readable shape) or as a Markdown summary for humans.

use crate::cli::OutputFormat;
use crate::config::ReportConfig;
use crate::models::{Diagnostic, MetricSet, ReportMetadata, RunReport};
use anyhow::{Context, Result};
use std::path::Path;

/// Render the report in the requested format.
pub fn render_report(
    report: &RunReport,
    format: OutputFormat,
    config: &ReportConfig,
) -> Result<String> {
    match format {
        OutputFormat::Json => generate_json_report(report),
        OutputFormat::Markdown => Ok(generate_markdown_report(report, config)),
    }
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &RunReport, config: &ReportConfig) -> String {
    let mut output = String::new();
    let evaluation = &report.evaluation;

    output.push_str("# Extraction Evaluation Report\n\n");

    output.push_str(&generate_metadata_section(
        &report.metadata,
        evaluation.document_count,
    ));

    output.push_str(&generate_overall_section(&evaluation.overall, config.decimals));

    let worst = evaluation.worst_fields(config.worst_fields);
    output.push_str(&generate_worst_fields_section(&worst, config.decimals));

    let all: Vec<(&str, &MetricSet)> = evaluation
        .fields
        .iter()
        .map(|(path, metrics)| (path.as_str(), metrics))
        .collect();
    output.push_str(&generate_fields_section(&all, config.decimals));

    if config.include_errors {
        output.push_str(&generate_errors_section(&evaluation.errors));
    }

    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata, document_count: u64) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Input:** `{}`\n", metadata.input_dir));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Files Scanned:** {}\n", metadata.files_scanned));
    if metadata.files_failed > 0 {
        section.push_str(&format!("- **Files Failed:** {}\n", metadata.files_failed));
    }
    section.push_str(&format!("- **Documents Evaluated:** {}\n", document_count));
    section.push_str(&format!(
        "- **Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the overall metrics section.
fn generate_overall_section(overall: &MetricSet, decimals: usize) -> String {
    let mut section = String::new();

    section.push_str("## Overall\n\n");
    section.push_str("| Precision | Recall | F1 | Accuracy | TP | FP | FN | TN |\n");
    section.push_str("|:---:|:---:|:---:|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} {} | {} | {} | {} | {} | {} |\n\n",
        fmt_ratio(overall.precision, decimals),
        fmt_ratio(overall.recall, decimals),
        f1_badge(overall.f1),
        fmt_ratio(overall.f1, decimals),
        fmt_ratio(overall.accuracy, decimals),
        overall.counts.tp,
        overall.counts.fp,
        overall.counts.fn_,
        overall.counts.tn,
    ));

    section
}

/// Generate the lowest-F1 fields section.
fn generate_worst_fields_section(worst: &[(&str, &MetricSet)], decimals: usize) -> String {
    if worst.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Weakest Fields\n\n");
    section.push_str(&metrics_table(worst, decimals));
    section
}

/// Generate the full per-field section.
fn generate_fields_section(fields: &[(&str, &MetricSet)], decimals: usize) -> String {
    let mut section = String::new();

    section.push_str("## Fields\n\n");

    if fields.is_empty() {
        section.push_str("No per-field results were found.\n\n");
        return section;
    }

    section.push_str(&metrics_table(fields, decimals));
    section
}

fn metrics_table(rows: &[(&str, &MetricSet)], decimals: usize) -> String {
    let mut table = String::new();

    table.push_str("| Field | Precision | Recall | F1 | Accuracy | TP | FP | FN |\n");
    table.push_str("|:---|:---:|:---:|:---:|:---:|:---:|:---:|:---:|\n");

    for (path, metrics) in rows {
        table.push_str(&format!(
            "| `{}` | {} | {} | {} {} | {} | {} | {} | {} |\n",
            path,
            fmt_ratio(metrics.precision, decimals),
            fmt_ratio(metrics.recall, decimals),
            f1_badge(metrics.f1),
            fmt_ratio(metrics.f1, decimals),
            fmt_ratio(metrics.accuracy, decimals),
            metrics.counts.tp,
            metrics.counts.fp,
            metrics.counts.fn_,
        ));
    }
    table.push('\n');

    table
}

/// Generate the diagnostics section.
fn generate_errors_section(errors: &[Diagnostic]) -> String {
    if errors.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Diagnostics\n\n");
    section.push_str(&format!(
        "{} input problem(s) were skipped during aggregation:\n\n",
        errors.len()
    ));

    for error in errors {
        section.push_str(&format!("- {}\n", error));
    }
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    "---\n\n*Report generated by fieldeval*\n".to_string()
}

/// Color badge for an F1 score.
pub fn f1_badge(f1: f64) -> &'static str {
    if f1 >= 0.9 {
        "🟢"
    } else if f1 >= 0.7 {
        "🟡"
    } else {
        "🔴"
    }
}

fn fmt_ratio(value: f64, decimals: usize) -> String {
    format!("{:.*}", decimals, value)
}

/// Generate a JSON report.
pub fn generate_json_report(report: &RunReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write rendered report content to a file.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Aggregator;
    use chrono::Utc;
    use serde_json::json;

    fn create_test_report() -> RunReport {
        let mut agg = Aggregator::new();
        agg.update(
            Some(&json!({
                "overall": {"tp": 9, "fp": 1, "fn": 1},
                "fields": {
                    "vendor_name": {"tp": 1, "fp": 2, "fn": 1},
                    "total": {"tp": 5}
                }
            })),
            Some("doc-1"),
        );
        agg.update(Some(&json!(42)), Some("doc-2"));

        RunReport {
            metadata: ReportMetadata {
                input_dir: "results".to_string(),
                generated_at: Utc::now(),
                files_scanned: 2,
                files_failed: 1,
                duration_seconds: 0.4,
            },
            evaluation: agg.compute(),
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = create_test_report();
        let markdown = generate_markdown_report(&report, &ReportConfig::default());

        assert!(markdown.contains("# Extraction Evaluation Report"));
        assert!(markdown.contains("## Overall"));
        assert!(markdown.contains("## Weakest Fields"));
        assert!(markdown.contains("`vendor_name`"));
        assert!(markdown.contains("0.333"));
        assert!(markdown.contains("## Diagnostics"));
        assert!(markdown.contains("doc-2"));
        assert!(markdown.contains("Files Failed:"));
    }

    #[test]
    fn test_markdown_omits_errors_when_disabled() {
        let report = create_test_report();
        let config = ReportConfig {
            include_errors: false,
            ..ReportConfig::default()
        };
        let markdown = generate_markdown_report(&report, &config);
        assert!(!markdown.contains("## Diagnostics"));
    }

    #[test]
    fn test_worst_fields_listed_first() {
        let report = create_test_report();
        let config = ReportConfig {
            worst_fields: 1,
            ..ReportConfig::default()
        };
        let markdown = generate_markdown_report(&report, &config);

        let weakest = markdown.split("## Weakest Fields").nth(1).unwrap();
        let weakest = weakest.split("## Fields").next().unwrap();
        assert!(weakest.contains("vendor_name"));
        assert!(!weakest.contains("`total`"));
    }

    #[test]
    fn test_f1_badge() {
        assert_eq!(f1_badge(0.95), "🟢");
        assert_eq!(f1_badge(0.75), "🟡");
        assert_eq!(f1_badge(0.0), "🔴");
    }

    #[test]
    fn test_generate_json_report() {
        let report = create_test_report();
        let json = generate_json_report(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["document_count"], 1);
        assert_eq!(value["fields"]["vendor_name"]["fp"], 2);
        assert_eq!(value["errors"].as_array().unwrap().len(), 1);
        assert_eq!(value["metadata"]["files_failed"], 1);
    }

    #[test]
    fn test_write_report_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/report.md");
        write_report("hello", &path).unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "hello");
    }
}
