//! SciScan CLI: terminal interface for the scientific article analyzer.
//!
//! Analyzes a link, pasted text or PDF and manages the local history.

mod commands;
mod render;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// SciScan: structured summaries and quality scores for scientific articles
#[derive(Parser, Debug)]
#[command(name = "sciscan", version, about, long_about = None)]
struct Cli {
    /// Model to use for analysis
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Workspace directory
    #[arg(short, long, default_value = ".", global = true)]
    workspace: PathBuf,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub(crate) enum Commands {
    /// Analyze a link, DOI, pasted text or PDF
    Analyze(AnalyzeArgs),
    /// Browse and manage past analyses
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args, Debug, Default)]
pub(crate) struct AnalyzeArgs {
    /// Link, DOI or article text ("-" reads from stdin)
    pub text: Option<String>,

    /// PDF file to analyze
    #[arg(long)]
    pub pdf: Option<PathBuf>,

    #[command(flatten)]
    pub view: ViewArgs,
}

/// How a record is displayed.
#[derive(clap::Args, Debug, Default, Clone, Copy)]
pub(crate) struct ViewArgs {
    /// Show the technical summary instead of the explanatory one
    #[arg(long)]
    pub academic: bool,

    /// Show the translated title
    #[arg(long)]
    pub translated_title: bool,

    /// Print the raw record as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(clap::Subcommand, Debug)]
pub(crate) enum HistoryAction {
    /// List saved analyses, most recent first
    List {
        /// Print entries as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one saved analysis
    Show {
        id: String,
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Delete a saved analysis
    Delete { id: String },
}

#[derive(clap::Subcommand, Debug)]
pub(crate) enum ConfigAction {
    /// Create a default workspace configuration file
    Init,
    /// Show the effective configuration
    Show,
}

/// Settings that apply to every subcommand.
#[derive(Debug, Clone, Default)]
pub(crate) struct GlobalOptions {
    pub model: Option<String>,
    pub quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let log_dir = sciscan_core::config::project_dirs()
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "sciscan.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    // Resolve workspace
    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let options = GlobalOptions {
        model: cli.model,
        quiet: cli.quiet,
    };
    commands::handle_command(cli.command, &workspace, &options).await
}
