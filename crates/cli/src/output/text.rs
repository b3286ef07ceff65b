use std::path::PathBuf;

use anyhow::Result;
use colored::{ColoredString, Colorize};
use riskguard::{RiskLevel, ScoreResult, Severity};

fn severity_label(severity: Severity) -> ColoredString {
    match severity {
        Severity::Critical => "CRITICAL".magenta().bold(),
        Severity::High => "HIGH".red().bold(),
        Severity::Medium => "MEDIUM".yellow().bold(),
        Severity::Low => "LOW".blue(),
    }
}

fn risk_label(level: RiskLevel) -> ColoredString {
    let text = level.as_str().to_uppercase();
    match level {
        RiskLevel::Critical => text.magenta().bold(),
        RiskLevel::High => text.red().bold(),
        RiskLevel::Medium => text.yellow().bold(),
        RiskLevel::Low => text.blue(),
        RiskLevel::None => text.green(),
    }
}

pub fn print(result: &ScoreResult, quiet: bool, no_color: bool) -> Result<()> {
    if no_color {
        colored::control::set_override(false);
    }

    if !quiet {
        println!();
        println!("{}", "  riskguard - Risk Scoring".bold());
        println!(
            "  Score: {}/100  Risk: {}  Result: {}",
            result.overall_score,
            risk_label(result.risk_level),
            if result.passed {
                "PASS".green().bold()
            } else {
                "FAIL".red().bold()
            }
        );
        println!();
    }

    print_violations(result);

    if !quiet {
        println!("{}", "  Detector Scores".bold().underline());
        for (name, score) in &result.detector_scores {
            println!("    {:<22} {}", name, score);
        }
        for name in &result.failed_detectors {
            println!("    {:<22} {}", name, "failed".red());
        }
        println!();

        if !result.recommendations.is_empty() {
            println!("{}", "  Recommendations".bold().underline());
            for rec in &result.recommendations {
                println!("    {} {}", "-".green(), rec);
            }
            println!();
        }
    }

    Ok(())
}

fn print_violations(result: &ScoreResult) {
    if result.aggregated_violations.is_empty() {
        println!("  {} No violations found.", "✓".green().bold());
        println!();
        return;
    }

    for violation in &result.aggregated_violations {
        println!(
            "  [{}] {} ({})",
            severity_label(violation.severity),
            violation.message,
            violation.kind
        );
        if let Some(location) = &violation.location {
            println!("    {} {}", "-->".dimmed(), location);
        }
    }
    println!();
}

pub fn print_scan(results: &[(PathBuf, ScoreResult)], quiet: bool, no_color: bool) -> Result<()> {
    if no_color {
        colored::control::set_override(false);
    }

    if !quiet {
        println!();
        println!("{}", "  riskguard - Source Scan".bold());
        println!("  Files scanned: {}", results.len());
        println!();
    }

    let mut failed = 0usize;
    for (file, result) in results {
        if result.aggregated_violations.is_empty() {
            continue;
        }
        if !result.passed {
            failed += 1;
        }
        println!(
            "  {} score {} ({})",
            file.display().to_string().bold(),
            result.overall_score,
            risk_label(result.risk_level)
        );
        for violation in &result.aggregated_violations {
            let location = violation.location.as_deref().unwrap_or("-");
            println!(
                "    [{}] {} {} {}",
                severity_label(violation.severity),
                violation.message,
                "-->".dimmed(),
                location
            );
        }
        println!();
    }

    if !quiet {
        println!("{}", "  Summary".bold().underline());
        println!("    Files scanned: {}", results.len());
        println!("    Failed:        {}", failed);
        println!();
    }

    Ok(())
}
