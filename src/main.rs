//! Clipmill batch clip converter
//!
//! Converts per-video clip timing annotations and extracted frame sequences
//! (or raw source videos) into individual encoded clips, sharded across
//! machines and workers, safe to interrupt and resume.
//!
//! # Usage
//!
//! ```bash
//! clipmill run --catalog cat.json --timestamps-dir ts/ --folder-map map.txt \
//!     --frame-root frames/ --output-root out/ --workers 8
//! clipmill run --catalog cat.json --timestamps-dir ts/ --folder-map map.txt \
//!     --video-root vids/ --output-root out/ --hwaccel --slots 4
//! clipmill plan --catalog cat.json ... --format json
//! ```

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use clipmill_cli::cli::{commands, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    match cli.command {
        Commands::Run(args) => commands::run(args).await,
        Commands::Plan(args) => commands::plan(args).await,
    }
}

/// Initialize the tracing subscriber; RUST_LOG wins over --log-level.
///
/// Logs go to stderr so stdout carries only command output (the plan
/// formats are consumed by other tools).
fn init_logging(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}
