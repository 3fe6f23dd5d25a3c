//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

/// Scan command arguments.
#[derive(Debug, Args)]
pub struct ScanCommand {
    /// Detect and print findings without writing the CSV or reports
    #[arg(long)]
    pub dry_run: bool,

    /// Update the CSV but skip report and alert files
    #[arg(long)]
    pub no_report: bool,

    /// Open written report files in the default viewer
    #[arg(long)]
    pub open: bool,
}

/// Watch command arguments.
#[derive(Debug, Args)]
pub struct WatchCommand {
    /// Seconds between passes (overrides the configured interval)
    #[arg(short, long)]
    pub interval: Option<u64>,

    /// Update the CSV but skip report and alert files
    #[arg(long)]
    pub no_report: bool,

    /// Open written report files in the default viewer
    #[arg(long)]
    pub open: bool,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Only show findings from this source address
    #[arg(long, value_name = "ADDR")]
    pub ip: Option<String>,

    /// Maximum number of findings to show (most recent last)
    #[arg(short, long, default_value = "20")]
    pub limit: usize,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Output format for the list command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// JSON output
    Json,
    /// CSV rows in the ledger's format
    Csv,
}
