use std::fmt::Write as _;
use std::str::FromStr;

use thiserror::Error;

use super::builder::{risk_color, severity_color};
use super::types::Report;
use crate::scorer::{RiskLevel, ScoreResult};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("unsupported export format '{0}' (expected json, csv, html or markdown)")]
    UnsupportedFormat(String),
    #[error("failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    Html,
    Markdown,
}

impl FromStr for ExportFormat {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            "html" => Ok(ExportFormat::Html),
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            _ => Err(ReportError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Builds reports from score results and renders them as text.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reporter;

impl Reporter {
    pub fn new() -> Self {
        Self
    }

    pub fn generate_report(&self, result: &ScoreResult) -> Report {
        Report::from_score(result)
    }

    pub fn export_report(&self, report: &Report, format: ExportFormat) -> Result<String, ReportError> {
        match format {
            ExportFormat::Json => Ok(serde_json::to_string_pretty(report)?),
            ExportFormat::Csv => Ok(to_csv(report)),
            ExportFormat::Html => Ok(to_html(report)),
            ExportFormat::Markdown => Ok(to_markdown(report)),
        }
    }

    /// Export by format name; unknown names fail with `UnsupportedFormat`.
    pub fn export_report_as(&self, report: &Report, format: &str) -> Result<String, ReportError> {
        self.export_report(report, format.parse()?)
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_row(fields: &[&str]) -> String {
    let mut row = fields.iter().map(|f| csv_field(f)).collect::<Vec<_>>().join(",");
    row.push('\n');
    row
}

fn to_csv(report: &Report) -> String {
    let s = &report.summary;
    let mut out = String::new();
    out.push_str(&csv_row(&["Risk Assessment Report"]));
    out.push_str(&csv_row(&["Generated", &report.generated_at.to_rfc3339()]));
    out.push('\n');
    out.push_str(&csv_row(&["Summary"]));
    out.push_str(&csv_row(&["Overall Score", &s.overall_score.to_string()]));
    out.push_str(&csv_row(&["Risk Level", &s.risk_level.to_string()]));
    out.push_str(&csv_row(&["Passed", &s.passed.to_string()]));
    out.push_str(&csv_row(&["Total Violations", &s.total_violations.to_string()]));
    out.push('\n');
    out.push_str(&csv_row(&["Type", "Severity", "Message", "Location"]));
    for v in &report.details.violations {
        out.push_str(&csv_row(&[
            v.kind.as_str(),
            &v.severity.to_string(),
            &v.message,
            v.location.as_deref().unwrap_or(""),
        ]));
    }
    out
}

fn html_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn to_html(report: &Report) -> String {
    let s = &report.summary;
    let mut out = String::new();
    let _ = write!(
        out,
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Risk Assessment Report</title>
<style>
body {{ font-family: sans-serif; margin: 2em; }}
table {{ border-collapse: collapse; width: 100%; }}
th, td {{ border: 1px solid #ddd; padding: 8px; text-align: left; }}
th {{ background: #f4f4f4; }}
.risk {{ color: #fff; padding: 2px 8px; border-radius: 4px; }}
</style>
</head>
<body>
<h1>Risk Assessment Report</h1>
<p>Generated: {generated}</p>
<h2>Summary</h2>
<ul>
<li>Overall Score: {score}</li>
<li>Risk Level: <span class="risk" style="background: {color}">{level}</span></li>
<li>Status: {status}</li>
<li>Total Violations: {total}</li>
</ul>
"#,
        generated = report.generated_at.to_rfc3339(),
        score = s.overall_score,
        color = risk_color(s.risk_level),
        level = s.risk_level,
        status = if s.passed { "PASSED" } else { "FAILED" },
        total = s.total_violations,
    );

    out.push_str("<h2>Violations</h2>\n");
    if report.details.violations.is_empty() {
        out.push_str("<p>No violations found.</p>\n");
    } else {
        out.push_str("<table>\n<tr><th>Type</th><th>Severity</th><th>Message</th><th>Location</th></tr>\n");
        for v in &report.details.violations {
            let _ = writeln!(
                out,
                r#"<tr><td>{}</td><td style="color: {}">{}</td><td>{}</td><td>{}</td></tr>"#,
                v.kind,
                severity_color(v.severity),
                v.severity,
                html_escape(&v.message),
                html_escape(v.location.as_deref().unwrap_or("")),
            );
        }
        out.push_str("</table>\n");
    }

    out.push_str("<h2>Detector Scores</h2>\n<table>\n<tr><th>Detector</th><th>Score</th></tr>\n");
    for row in &report.details.detector_scores {
        let _ = writeln!(
            out,
            "<tr><td>{}</td><td>{}</td></tr>",
            html_escape(&row.detector),
            row.score
        );
    }
    out.push_str("</table>\n");

    if !report.details.recommendations.is_empty() {
        out.push_str("<h2>Recommendations</h2>\n<ul>\n");
        for r in &report.details.recommendations {
            let _ = writeln!(out, "<li>{}</li>", html_escape(r));
        }
        out.push_str("</ul>\n");
    }
    out.push_str("</body>\n</html>\n");
    out
}

fn risk_emoji(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::None => "✅",
        RiskLevel::Low => "🟢",
        RiskLevel::Medium => "🟡",
        RiskLevel::High => "🟠",
        RiskLevel::Critical => "🔴",
    }
}

fn md_cell(value: &str) -> String {
    value.replace('|', "\\|").replace('\n', " ")
}

fn to_markdown(report: &Report) -> String {
    let s = &report.summary;
    let mut out = String::new();
    let _ = writeln!(out, "# Risk Assessment Report\n");
    let _ = writeln!(out, "_Generated: {}_\n", report.generated_at.to_rfc3339());
    let _ = writeln!(out, "## Summary\n");
    let _ = writeln!(out, "- **Overall Score:** {}", s.overall_score);
    let _ = writeln!(
        out,
        "- **Risk Level:** {} {}",
        risk_emoji(s.risk_level),
        s.risk_level
    );
    let _ = writeln!(
        out,
        "- **Status:** {}",
        if s.passed { "✅ PASSED" } else { "❌ FAILED" }
    );
    let _ = writeln!(out, "- **Total Violations:** {}\n", s.total_violations);

    if !s.top_risks.is_empty() {
        let _ = writeln!(out, "## Top Risks\n");
        for (i, risk) in s.top_risks.iter().enumerate() {
            let _ = writeln!(
                out,
                "{}. **{}** ({}) {}",
                i + 1,
                risk.kind,
                risk.severity,
                risk.message
            );
        }
        out.push('\n');
    }

    let _ = writeln!(out, "## Violations\n");
    if report.details.violations.is_empty() {
        let _ = writeln!(out, "No violations found.\n");
    } else {
        let _ = writeln!(out, "| Type | Severity | Message | Location |");
        let _ = writeln!(out, "|------|----------|---------|----------|");
        for v in &report.details.violations {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} |",
                v.kind,
                v.severity,
                md_cell(&v.message),
                md_cell(v.location.as_deref().unwrap_or("-"))
            );
        }
        out.push('\n');
    }

    let _ = writeln!(out, "## Detector Scores\n");
    let _ = writeln!(out, "| Detector | Score |");
    let _ = writeln!(out, "|----------|-------|");
    for row in &report.details.detector_scores {
        let _ = writeln!(out, "| {} | {} |", md_cell(&row.detector), row.score);
    }
    out.push('\n');

    if !report.details.recommendations.is_empty() {
        let _ = writeln!(out, "## Recommendations\n");
        for r in &report.details.recommendations {
            let _ = writeln!(out, "- {r}");
        }
    }
    out
}
