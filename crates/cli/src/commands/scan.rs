use std::path::{Path, PathBuf};

use anyhow::Result;
use riskguard::{Context, ExportFormat, Input, Reporter, ScoreResult};
use serde_json::json;
use tracing::debug;
use walkdir::WalkDir;

use super::load_config;
use crate::output;
use crate::OutputFormat;

/// File extensions treated as source code.
const SOURCE_EXTENSIONS: [&str; 12] = [
    "rs", "js", "jsx", "ts", "tsx", "mjs", "cjs", "py", "java", "go", "rb", "php",
];

pub fn run(
    path: &Path,
    format: OutputFormat,
    config: Option<PathBuf>,
    quiet: bool,
    no_color: bool,
) -> Result<()> {
    let config = load_config(config)?;
    let files = collect_files(path, |p| config.is_file_excluded(p));
    let scorer = riskguard_detectors::default_scorer(config)?;

    if !quiet {
        eprintln!("Scanning {} files...", files.len());
    }

    let mut results: Vec<(PathBuf, ScoreResult)> = Vec::new();
    for file in files {
        let Ok(source) = std::fs::read_to_string(&file) else {
            debug!(file = %file.display(), "skipping unreadable file");
            continue;
        };
        let context = Context::new().with_source(file.display().to_string());
        let result = scorer.score(&Input::from(source), Some(&context));
        results.push((file, result));
    }

    match format.export() {
        Some(export) => println!("{}", render_reports(&results, export)?),
        None => output::text::print_scan(&results, quiet, no_color)?,
    }

    if results.iter().any(|(_, r)| !r.passed) {
        std::process::exit(1);
    }
    Ok(())
}

/// One exported report per file. JSON is a single array of `{file, report}`;
/// the other formats concatenate per-file reports under a file heading.
pub fn render_reports(results: &[(PathBuf, ScoreResult)], format: ExportFormat) -> Result<String> {
    let reporter = Reporter::new();
    if format == ExportFormat::Json {
        let rows: Vec<_> = results
            .iter()
            .map(|(file, result)| {
                json!({ "file": file.display().to_string(), "report": reporter.generate_report(result) })
            })
            .collect();
        return Ok(serde_json::to_string_pretty(&rows)?);
    }

    let mut sections = Vec::with_capacity(results.len());
    for (file, result) in results {
        let report = reporter.export_report(&reporter.generate_report(result), format)?;
        let heading = match format {
            ExportFormat::Markdown | ExportFormat::Html => format!("<!-- file: {} -->", file.display()),
            _ => format!("# file: {}", file.display()),
        };
        sections.push(format!("{heading}\n{report}"));
    }
    Ok(sections.join("\n"))
}

/// Source files under `root`, sorted, minus excluded paths.
pub fn collect_files(root: &Path, excluded: impl Fn(&Path) -> bool) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
        })
        .filter(|p| {
            let relative = p.strip_prefix(root).unwrap_or(p);
            !excluded(relative)
        })
        .collect();
    files.sort();
    files
}
