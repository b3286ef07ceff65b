mod commands;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use riskguard::ExportFormat;

#[derive(Parser)]
#[command(name = "riskguard")]
#[command(about = "Risk scoring for untrusted input and source code")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score one input (JSON or plain text) and print a risk report
    Score {
        /// Input file; reads stdin when omitted or "-"
        path: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Path to config file (default: .riskguard.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Fail on any violation regardless of score
        #[arg(long)]
        strict: bool,

        /// Override the pass/fail score threshold
        #[arg(short, long)]
        threshold: Option<f64>,

        /// User id for behavioral baselines
        #[arg(long)]
        user_id: Option<String>,

        /// Source label attached to the request context
        #[arg(long)]
        source: Option<String>,

        /// Suppress banner and summary
        #[arg(short, long)]
        quiet: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },
    /// Score every source file under a directory
    Scan {
        /// Directory or file to scan
        path: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Path to config file (default: .riskguard.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Suppress banner and summary
        #[arg(short, long)]
        quiet: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },
    /// List all available detectors
    List,
    /// Generate a default .riskguard.toml config file
    Init,
}

#[derive(ValueEnum, Clone, Copy)]
enum OutputFormat {
    Text,
    Json,
    Csv,
    Html,
    Markdown,
}

impl OutputFormat {
    /// Report export format; `None` for terminal text.
    fn export(self) -> Option<ExportFormat> {
        match self {
            OutputFormat::Text => None,
            OutputFormat::Json => Some(ExportFormat::Json),
            OutputFormat::Csv => Some(ExportFormat::Csv),
            OutputFormat::Html => Some(ExportFormat::Html),
            OutputFormat::Markdown => Some(ExportFormat::Markdown),
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Score {
            path,
            format,
            config,
            strict,
            threshold,
            user_id,
            source,
            quiet,
            no_color,
        } => commands::score::run(commands::score::ScoreArgs {
            path,
            format,
            config,
            strict,
            threshold,
            user_id,
            source,
            quiet,
            no_color,
        }),
        Commands::Scan {
            path,
            format,
            config,
            quiet,
            no_color,
        } => commands::scan::run(&path, format, config, quiet, no_color),
        Commands::List => commands::list::run(),
        Commands::Init => commands::init::run(),
    }
}
