//! CLI module for clipmill
//!
//! This module handles command-line argument parsing and command execution.

use clap::{Parser, Subcommand};

pub mod args;
pub mod commands;

/// Clipmill batch clip converter
///
/// Converts per-video clip timing annotations and extracted frame sequences
/// (or raw source videos) into individual encoded clips, partitioned across
/// shards and workers, safe to interrupt and resume.
#[derive(Parser)]
#[command(name = "clipmill")]
#[command(about = "Batch video clip conversion with sharding and resume")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Logging level when RUST_LOG is unset
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Convert this shard's clips
    Run(args::RunArgs),
    /// Show this shard's planned work without encoding anything
    Plan(args::PlanArgs),
}
