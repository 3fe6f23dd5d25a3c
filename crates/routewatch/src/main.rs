//! `routewatch` - CLI for MikroTik failed-login monitoring
//!
//! This binary provides the command-line interface for scanning and watching
//! a router's log and for querying the recorded findings.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::Context;
use clap::Parser;

use routewatch::cli::{
    Cli, Command, ConfigCommand, ListCommand, OutputFormat, ScanCommand, StatusCommand,
    WatchCommand,
};
use routewatch::monitor::{self, PassOptions, RouterSource, WatchHandle};
use routewatch::{init_logging, Config, Detector, Ledger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Config subcommands have their own file handling
    if let Command::Config(config_cmd) = &cli.command {
        return handle_config(cli.config.clone(), config_cmd);
    }

    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    match cli.command {
        Command::Scan(scan_cmd) => handle_scan(&config, &scan_cmd).await,
        Command::Watch(watch_cmd) => handle_watch(config, &watch_cmd).await,
        Command::Status(status_cmd) => handle_status(&config, &status_cmd),
        Command::List(list_cmd) => handle_list(&config, &list_cmd),
        Command::Config(_) => unreachable!("handled above"),
    }
}

fn pass_options(config: &Config, no_report: bool, open: bool) -> PassOptions {
    let mut options = PassOptions::from_config(config);
    options.write_reports = options.write_reports && !no_report;
    options.open_reports = options.open_reports || open;
    options
}

async fn handle_scan(config: &Config, cmd: &ScanCommand) -> anyhow::Result<()> {
    let detector = Detector::from_config(&config.detection);
    let mut source = RouterSource::new(config);
    let mut options = pass_options(config, cmd.no_report, cmd.open);
    options.dry_run = cmd.dry_run;

    println!("Scanning {}...", config.router_addr());
    let outcome = monitor::run_pass(&mut source, config, &detector, options)
        .await
        .context("monitoring pass failed")?;

    println!("Retrieved {} log entries", outcome.fetched);
    if outcome.new_findings.is_empty() {
        println!("No new failed logins found");
    } else if cmd.dry_run {
        println!(
            "Found {} new failed login(s) (dry run, nothing written)",
            outcome.new_findings.len()
        );
        for finding in &outcome.new_findings {
            println!("  {}  {}", finding.time, finding.message);
        }
    } else {
        println!("Logged {} new failed login(s)", outcome.new_findings.len());
    }

    for hit in &outcome.brute_hits {
        println!(
            "Brute force suspected from {} ({} attempts)",
            hit.ip, hit.attempts
        );
    }
    if let Some(path) = &outcome.report_path {
        println!("Report: {}", path.display());
    }
    if let Some(path) = &outcome.alert_path {
        println!("Alert:  {}", path.display());
    }
    Ok(())
}

async fn handle_watch(mut config: Config, cmd: &WatchCommand) -> anyhow::Result<()> {
    if let Some(interval) = cmd.interval {
        anyhow::ensure!(interval > 0, "interval must be greater than 0");
        config.watch.interval_secs = interval;
    }

    let detector = Detector::from_config(&config.detection);
    let mut source = RouterSource::new(&config);
    let options = pass_options(&config, cmd.no_report, cmd.open);
    let handle = WatchHandle::new();

    println!(
        "Watching {} every {}s (Ctrl-C to stop)",
        config.router_addr(),
        config.watch.interval_secs
    );
    let summary = monitor::watch(&mut source, &config, &detector, options, &handle).await?;

    println!(
        "Stopped after {} pass(es): {} new finding(s), {} alert(s), {} failed pass(es)",
        summary.passes, summary.new_findings, summary.alerts, summary.failed_passes
    );
    Ok(())
}

fn handle_status(config: &Config, cmd: &StatusCommand) -> anyhow::Result<()> {
    let ledger = Ledger::load(&config.output.csv_path).context("loading ledger")?;
    let stats = ledger.stats();

    if cmd.json {
        let status = serde_json::json!({
            "router": config.router_addr(),
            "ledger_path": config.output.csv_path,
            "ledger": stats,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("routewatch status");
        println!("-----------------");
        println!("Router:        {}", config.router_addr());
        println!("Ledger:        {}", config.output.csv_path.display());
        println!("Findings:      {}", stats.total);
        println!("Distinct IPs:  {}", stats.distinct_ips);
        match (stats.oldest, stats.newest) {
            (Some(oldest), Some(newest)) => {
                println!("Oldest:        {oldest}");
                println!("Newest:        {newest}");
            }
            _ => println!("Timestamps:    none parseable"),
        }
        println!("File size:     {} bytes", stats.file_size);
    }
    Ok(())
}

fn handle_list(config: &Config, cmd: &ListCommand) -> anyhow::Result<()> {
    let ledger = Ledger::load(&config.output.csv_path).context("loading ledger")?;

    let matches_ip = |finding: &&routewatch::Finding| match &cmd.ip {
        Some(wanted) => routewatch::detect::extract_ip(&finding.message)
            .is_some_and(|ip| ip.to_string() == *wanted),
        None => true,
    };
    let selected: Vec<_> = ledger
        .findings()
        .iter()
        .filter(matches_ip)
        .collect();
    // Keep the most recent entries when over the limit
    let start = selected.len().saturating_sub(cmd.limit);
    let selected = &selected[start..];

    match cmd.format {
        OutputFormat::Plain => {
            if selected.is_empty() {
                println!("No findings recorded");
            }
            for finding in selected {
                println!("{}  [{}]  {}", finding.time, finding.topics, finding.message);
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&selected)?);
        }
        OutputFormat::Csv => {
            println!("{}", routewatch::ledger::LEDGER_HEADER);
            for finding in selected {
                println!("{}", routewatch::ledger::csv_row(finding));
            }
        }
    }
    Ok(())
}

fn handle_config(config_path: Option<std::path::PathBuf>, cmd: &ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(config_path).context("loading configuration")?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Router]");
                println!("  Address:          {}", config.router_addr());
                println!("  Username:         {}", config.username);
                println!("  Timeout (s):      {}", config.timeout_secs);
                println!();
                println!("[Detection]");
                println!(
                    "  Keywords:         {}",
                    config.detection.failure_keywords.join(", ")
                );
                println!(
                    "  Extra patterns:   {}",
                    config.detection.extra_patterns.len()
                );
                println!(
                    "  Brute force:      {} attempts in {} minutes",
                    config.detection.brute_force_threshold,
                    config.detection.brute_force_window_minutes
                );
                println!();
                println!("[Output]");
                println!("  Ledger:           {}", config.output.csv_path.display());
                println!("  Report dir:       {}", config.output.report_dir.display());
                println!("  Write reports:    {}", config.output.write_reports);
                println!("  Open reports:     {}", config.output.open_reports);
                println!();
                println!("[Watch]");
                println!("  Interval (s):     {}", config.watch.interval_secs);
            }
        }
        ConfigCommand::Path => {
            let path = config_path.unwrap_or_else(Config::default_config_path);
            println!("{}", path.display());
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .clone()
                .or(config_path)
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => {
                    println!("Configuration error: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
    Ok(())
}
