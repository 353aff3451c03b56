//! bidsreport CLI: writes methods-section drafts for BIDS participants.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use bidsreport_core::RenderStrategy;

/// Generate publication-style methods paragraphs from a BIDS dataset
#[derive(Parser, Debug)]
#[command(name = "bidsreport", version, about, long_about = None)]
pub(crate) struct Cli {
    /// Root of the BIDS dataset
    bids_dir: PathBuf,

    /// Directory the reports are written to
    output_dir: PathBuf,

    /// Participant label(s) without the `sub-` prefix (default: the first subject)
    #[arg(long = "participant-label", num_args = 1..)]
    participant_label: Vec<String>,

    /// Restrict reports to one session label
    #[arg(long)]
    session: Option<String>,

    /// Rendering strategy: template, strict
    #[arg(long)]
    strategy: Option<RenderStrategy>,

    /// Directory holding `templates/` and `partials/`
    #[arg(long)]
    templates: Option<PathBuf>,

    /// Converters JSON replacing the built-in vocabulary
    #[arg(long)]
    vocabulary: Option<PathBuf>,

    /// Also write per-group diagnostics as JSON
    #[arg(long)]
    json: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let log_dir = cli.output_dir.join("logs");
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::never(&log_dir, "bidsreport.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let config = commands::resolve_config(&cli)?;
    if cli.print_config {
        println!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    let summaries = commands::run(&cli, &config)?;
    if !cli.quiet {
        for summary in &summaries {
            commands::print_summary(summary);
        }
    }
    Ok(())
}
