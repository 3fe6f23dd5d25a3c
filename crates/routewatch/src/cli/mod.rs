//! Command-line interface for routewatch.
//!
//! This module provides the CLI structure and command handlers for the
//! `routewatch` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, ListCommand, OutputFormat, ScanCommand, StatusCommand, WatchCommand,
};

/// routewatch - Failed-login and brute-force monitoring for MikroTik routers
///
/// Polls a RouterOS device's log over the API, records failed logins in a
/// master CSV, and flags brute-force bursts.
#[derive(Debug, Parser)]
#[command(name = "routewatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one monitoring pass
    Scan(ScanCommand),

    /// Run passes on an interval until interrupted
    Watch(WatchCommand),

    /// Show router target and ledger statistics
    Status(StatusCommand),

    /// List recorded findings
    List(ListCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_name() {
        let cli = Cli::command();
        assert_eq!(cli.get_name(), "routewatch");
    }

    #[test]
    fn test_cli_verify() {
        // Verify the CLI structure is valid
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_quiet() {
        let cli = Cli {
            config: None,
            verbose: 0,
            quiet: true,
            command: Command::Status(StatusCommand { json: false }),
        };
        assert_eq!(cli.verbosity(), crate::logging::Verbosity::Quiet);
    }

    #[test]
    fn test_verbosity_levels() {
        for (verbose, expected) in [
            (0, crate::logging::Verbosity::Normal),
            (1, crate::logging::Verbosity::Verbose),
            (2, crate::logging::Verbosity::Trace),
        ] {
            let cli = Cli {
                config: None,
                verbose,
                quiet: false,
                command: Command::Status(StatusCommand { json: false }),
            };
            assert_eq!(cli.verbosity(), expected);
        }
    }

    #[test]
    fn test_parse_scan() {
        let cli = Cli::try_parse_from(["routewatch", "scan"]).unwrap();
        let Command::Scan(cmd) = cli.command else {
            panic!("expected scan command");
        };
        assert!(!cmd.dry_run);
        assert!(!cmd.no_report);
        assert!(!cmd.open);
    }

    #[test]
    fn test_parse_scan_flags() {
        let cli = Cli::try_parse_from(["routewatch", "scan", "--dry-run", "--open"]).unwrap();
        let Command::Scan(cmd) = cli.command else {
            panic!("expected scan command");
        };
        assert!(cmd.dry_run);
        assert!(cmd.open);
    }

    #[test]
    fn test_parse_watch_interval() {
        let cli = Cli::try_parse_from(["routewatch", "watch", "--interval", "30"]).unwrap();
        let Command::Watch(cmd) = cli.command else {
            panic!("expected watch command");
        };
        assert_eq!(cmd.interval, Some(30));
    }

    #[test]
    fn test_parse_list_filters() {
        let cli = Cli::try_parse_from([
            "routewatch",
            "list",
            "--ip",
            "192.0.2.7",
            "--limit",
            "5",
            "--format",
            "json",
        ])
        .unwrap();
        let Command::List(cmd) = cli.command else {
            panic!("expected list command");
        };
        assert_eq!(cmd.ip.as_deref(), Some("192.0.2.7"));
        assert_eq!(cmd.limit, 5);
        assert_eq!(cmd.format, OutputFormat::Json);
    }

    #[test]
    fn test_parse_config_validate() {
        let cli =
            Cli::try_parse_from(["routewatch", "config", "validate", "-f", "custom.json"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Config(ConfigCommand::Validate { file: Some(_) })
        ));
    }

    #[test]
    fn test_parse_with_global_flags() {
        let cli =
            Cli::try_parse_from(["routewatch", "-c", "/custom/mikrotik.json", "-v", "status"])
                .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/custom/mikrotik.json")));
        assert_eq!(cli.verbose, 1);
    }
}
