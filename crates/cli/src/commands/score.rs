use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use riskguard::config::ConfigUpdate;
use riskguard::{Context, Input, Reporter};

use super::load_config;
use crate::output;
use crate::OutputFormat;

pub struct ScoreArgs {
    pub path: Option<PathBuf>,
    pub format: OutputFormat,
    pub config: Option<PathBuf>,
    pub strict: bool,
    pub threshold: Option<f64>,
    pub user_id: Option<String>,
    pub source: Option<String>,
    pub quiet: bool,
    pub no_color: bool,
}

pub fn run(args: ScoreArgs) -> Result<()> {
    let raw = read_input(args.path.as_ref())?;
    let input = parse_input(&raw);

    let config = load_config(args.config)?;
    let mut scorer = riskguard_detectors::default_scorer(config)?;
    scorer.update_config(ConfigUpdate {
        strict_mode: args.strict.then_some(true),
        score_threshold: args.threshold,
        ..ConfigUpdate::default()
    })?;

    let mut context = Context::new();
    context.user_id = args.user_id;
    context.source = args
        .source
        .or_else(|| args.path.as_ref().map(|p| p.display().to_string()));

    let result = scorer.score(&input, Some(&context));

    match args.format.export() {
        Some(format) => {
            let reporter = Reporter::new();
            let report = reporter.generate_report(&result);
            println!("{}", reporter.export_report(&report, format)?);
        }
        None => output::text::print(&result, args.quiet, args.no_color)?,
    }

    if !result.passed {
        std::process::exit(1);
    }
    Ok(())
}

fn read_input(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(p) if p.as_os_str() != "-" => std::fs::read_to_string(p)
            .with_context(|| format!("Failed to read input from {}", p.display())),
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read input from stdin")?;
            Ok(buf)
        }
    }
}

/// JSON documents become structured inputs; anything else is scored as text.
pub fn parse_input(raw: &str) -> Input {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(value @ (serde_json::Value::Object(_) | serde_json::Value::Array(_))) => Input::from(value),
        _ => Input::from(raw),
    }
}
