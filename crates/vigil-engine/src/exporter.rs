//! Report rendering (JSON, CSV, HTML) and writing to disk.

use std::fmt::Write as _;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use html_escape::encode_text;
use serde_json::Value as JsonValue;
use tokio::fs;
use tracing::info;
use vigil_core::{AggregatedResult, ReportFormat, ReportingPolicy};

use crate::{EngineError, Result};

/// Number of recommendations shown in HTML reports.
const HTML_RECOMMENDATIONS: usize = 5;

/// Parses a format name.
///
/// # Errors
/// Returns [`EngineError::UnsupportedFormat`] for unknown names.
pub fn parse_format(name: &str) -> Result<ReportFormat> {
    name.parse()
        .map_err(|_| EngineError::UnsupportedFormat(name.to_owned()))
}

/// Renders `result` in `format`.
///
/// JSON is the full serialization of the result. PDF output is the JSON
/// rendering.
///
/// # Errors
/// Returns an error if serialization or formatting fails.
pub fn export(result: &AggregatedResult, format: ReportFormat) -> Result<String> {
    render(result, format, true)
}

/// Renders a report file body. Without `include_metrics` the JSON body omits
/// the performance and coverage sections.
fn render(result: &AggregatedResult, format: ReportFormat, include_metrics: bool) -> Result<String> {
    match format {
        ReportFormat::Json | ReportFormat::Pdf => to_json(result, include_metrics),
        ReportFormat::Csv => to_csv(result),
        ReportFormat::Html => to_html(result),
    }
}

fn to_json(result: &AggregatedResult, include_metrics: bool) -> Result<String> {
    let mut value = serde_json::to_value(result)?;
    if !include_metrics {
        if let JsonValue::Object(fields) = &mut value {
            fields.remove("performance");
            fields.remove("coverage");
        }
    }
    Ok(serde_json::to_string_pretty(&value)?)
}

fn to_csv(result: &AggregatedResult) -> Result<String> {
    let mut csv = String::from("Metric,Value\n");
    writeln!(csv, "Overall Score,{}", result.overall_score)?;
    writeln!(csv, "Compliant,{}", result.overall_compliant)?;
    writeln!(csv, "Total Issues,{}", result.total_issues)?;
    writeln!(csv, "Total Warnings,{}", result.total_warnings)?;
    writeln!(csv, "Total Errors,{}", result.total_errors)?;
    writeln!(csv, "Execution Time,{}ms", result.execution_duration_ms)?;
    writeln!(csv, "Compliance Level,{}", result.summary.compliance_level)?;
    Ok(csv)
}

fn to_html(result: &AggregatedResult) -> Result<String> {
    let status_class = if result.overall_compliant { "pass" } else { "fail" };
    let mut html = String::new();

    writeln!(html, "<!DOCTYPE html>")?;
    writeln!(html, "<html lang=\"en\">")?;
    writeln!(html, "<head>")?;
    writeln!(html, "<meta charset=\"utf-8\">")?;
    writeln!(
        html,
        "<title>Compliance Report - {}</title>",
        encode_text(&result.metadata.file_path)
    )?;
    writeln!(
        html,
        "<style>body{{font-family:sans-serif;margin:2rem}}.pass{{color:#1a7f37}}.fail{{color:#cf222e}}table{{border-collapse:collapse}}td,th{{border:1px solid #ccc;padding:4px 8px;text-align:left}}</style>"
    )?;
    writeln!(html, "</head>")?;
    writeln!(html, "<body>")?;
    writeln!(html, "<h1>Compliance Report</h1>")?;
    writeln!(
        html,
        "<p>File: <code>{}</code><br>Generated: {}</p>",
        encode_text(&result.metadata.file_path),
        result.timestamp.to_rfc3339()
    )?;
    writeln!(
        html,
        "<h2 class=\"{status_class}\">Score: {}/100 ({})</h2>",
        result.overall_score, result.summary.compliance_level
    )?;

    writeln!(html, "<h2>Summary</h2>")?;
    writeln!(html, "<table>")?;
    for (label, value) in [
        ("Validators passed", result.summary.passed),
        ("Validators failed", result.summary.failed),
        ("Total issues", result.total_issues),
        ("Errors", result.total_errors),
        ("Warnings", result.total_warnings),
        ("Critical issues", result.summary.critical_issues),
    ] {
        writeln!(html, "<tr><th>{label}</th><td>{value}</td></tr>")?;
    }
    writeln!(html, "</table>")?;

    writeln!(html, "<h2>Top Recommendations</h2>")?;
    if result.recommendations.is_empty() {
        writeln!(html, "<p>No issues found.</p>")?;
    } else {
        writeln!(html, "<ol>")?;
        for recommendation in result.recommendations.iter().take(HTML_RECOMMENDATIONS) {
            writeln!(
                html,
                "<li><strong>[{}] {}</strong>: {}<br><em>{}</em></li>",
                recommendation.severity.as_str(),
                encode_text(&recommendation.kind),
                encode_text(&recommendation.message),
                encode_text(&recommendation.action)
            )?;
        }
        writeln!(html, "</ol>")?;
    }

    if !result.summary.next_steps.is_empty() {
        writeln!(html, "<h2>Next Steps</h2>")?;
        writeln!(html, "<ul>")?;
        for step in &result.summary.next_steps {
            writeln!(html, "<li>{}</li>", encode_text(step))?;
        }
        writeln!(html, "</ul>")?;
    }

    writeln!(html, "</body>")?;
    writeln!(html, "</html>")?;
    Ok(html)
}

/// File name of a report written at `timestamp`.
pub fn report_file_name(format: ReportFormat, timestamp: DateTime<Utc>) -> String {
    format!(
        "compliance-report-{}.{}",
        timestamp.format("%Y%m%dT%H%M%S%3fZ"),
        format.extension()
    )
}

/// Writes `result` in every configured format under `policy.output_path`.
///
/// # Errors
/// Returns an error if rendering fails or a file cannot be written.
pub async fn write_reports(result: &AggregatedResult, policy: &ReportingPolicy) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(&policy.output_path).await?;
    let timestamp = Utc::now();

    let mut written = Vec::with_capacity(policy.formats.len());
    for &format in &policy.formats {
        let body = render(result, format, policy.include_metrics)?;
        let path = policy.output_path.join(report_file_name(format, timestamp));
        fs::write(&path, body).await?;
        info!(path = %path.display(), %format, "Wrote compliance report");
        written.push(path);
    }
    Ok(written)
}
