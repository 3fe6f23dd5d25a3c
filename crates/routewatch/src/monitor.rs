//! Pass orchestration and watch mode.
//!
//! A pass fetches the router's log, classifies it, records the new findings
//! in the ledger, sweeps them for brute-force bursts, and writes report
//! files. Watch mode repeats passes on an interval until interrupted.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use routewatch_routeros::Connection;

use crate::config::Config;
use crate::detect::{self, BruteForceHit, Detector};
use crate::error::Result;
use crate::event::{LogEntry, LogSource};
use crate::ledger::Ledger;
use crate::report;

/// A [`LogSource`] backed by a live RouterOS device.
///
/// Dials the router fresh for every fetch and drops the connection after,
/// so watch mode never holds an idle API session across intervals.
#[derive(Debug)]
pub struct RouterSource {
    host: String,
    port: u16,
    username: String,
    password: String,
    timeout: Duration,
    addr: String,
}

impl RouterSource {
    /// Create a source for the router named in the configuration.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            username: config.username.clone(),
            password: config.password.clone(),
            timeout: config.timeout(),
            addr: config.router_addr(),
        }
    }
}

#[async_trait::async_trait]
impl LogSource for RouterSource {
    fn name(&self) -> &str {
        &self.addr
    }

    async fn fetch(&mut self) -> Result<Vec<LogEntry>> {
        let mut conn = Connection::connect(&self.host, self.port, self.timeout).await?;
        conn.login(&self.username, &self.password).await?;
        let rows = conn.fetch_log().await?;
        conn.close().await?;
        Ok(rows.iter().map(LogEntry::from_attrs).collect())
    }
}

/// Per-pass behavior switches, derived from configuration and CLI flags.
#[derive(Debug, Clone, Copy)]
pub struct PassOptions {
    /// Detect and report to stdout, but write neither CSV nor files.
    pub dry_run: bool,
    /// Write per-pass report and alert files.
    pub write_reports: bool,
    /// Open freshly written files in the platform viewer.
    pub open_reports: bool,
}

impl PassOptions {
    /// Options as the configuration alone dictates them.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            dry_run: false,
            write_reports: config.output.write_reports,
            open_reports: config.output.open_reports,
        }
    }
}

/// What one pass found and wrote.
#[derive(Debug)]
pub struct PassOutcome {
    /// Log entries fetched from the source.
    pub fetched: usize,
    /// Entries that matched a failure pattern.
    pub matched: usize,
    /// Findings not yet in the ledger.
    pub new_findings: Vec<crate::event::Finding>,
    /// Addresses the brute-force sweep flagged among the new findings.
    pub brute_hits: Vec<BruteForceHit>,
    /// Failed-login report written this pass, if any.
    pub report_path: Option<PathBuf>,
    /// Brute-force alert written this pass, if any.
    pub alert_path: Option<PathBuf>,
}

/// Run one monitoring pass.
///
/// # Errors
///
/// Returns an error if the source cannot be fetched, the ledger is corrupt,
/// or report files cannot be written.
pub async fn run_pass(
    source: &mut dyn LogSource,
    config: &Config,
    detector: &Detector,
    options: PassOptions,
) -> Result<PassOutcome> {
    let entries = source.fetch().await?;
    info!(source = source.name(), entries = entries.len(), "fetched router log");

    let findings = detector.classify(&entries);
    let matched = findings.len();

    let mut ledger = Ledger::load(&config.output.csv_path)?;
    let new_findings: Vec<_> = findings
        .into_iter()
        .filter(|f| !ledger.contains(&f.fingerprint))
        .collect();

    if !options.dry_run {
        ledger.append(&new_findings)?;
    }

    let brute_hits = detect::sweep(
        &new_findings,
        config.detection.brute_force_threshold,
        config.brute_force_window(),
    );
    for hit in &brute_hits {
        warn!(
            ip = %hit.ip,
            attempts = hit.attempts,
            "brute-force pattern detected"
        );
    }

    let mut report_path = None;
    let mut alert_path = None;
    if !new_findings.is_empty() && options.write_reports && !options.dry_run {
        let now = Local::now();
        let dir = &config.output.report_dir;
        report_path = Some(report::write_failed_login_report(dir, &new_findings, now)?);
        if !brute_hits.is_empty() {
            alert_path = Some(report::write_brute_force_alert(
                dir,
                &brute_hits,
                config.detection.brute_force_threshold,
                config.detection.brute_force_window_minutes,
                now,
            )?);
        }
        if options.open_reports {
            for path in report_path.iter().chain(alert_path.iter()) {
                report::open_in_viewer(path);
            }
        }
    }

    Ok(PassOutcome {
        fetched: entries.len(),
        matched,
        new_findings,
        brute_hits,
        report_path,
        alert_path,
    })
}

/// A handle to stop a running watch loop.
///
/// Lightweight and cloneable; signal tasks hold a clone and flip the flag.
#[derive(Debug, Clone, Default)]
pub struct WatchHandle {
    stop_signal: Arc<AtomicBool>,
    stop_notify: Arc<Notify>,
}

impl WatchHandle {
    /// Create a new watch handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal the watch loop to stop and wake it if it is waiting out an
    /// interval.
    pub fn stop(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
        self.stop_notify.notify_one();
    }

    /// Check if the stop signal has been sent.
    #[must_use]
    pub fn should_stop(&self) -> bool {
        self.stop_signal.load(Ordering::SeqCst)
    }

    /// Wait until [`stop`](Self::stop) has been called. Returns immediately
    /// if it already was.
    pub async fn stopped(&self) {
        while !self.should_stop() {
            self.stop_notify.notified().await;
        }
    }
}

/// Totals for a finished watch session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WatchSummary {
    /// Passes attempted.
    pub passes: u64,
    /// Passes that failed (router unreachable, write errors).
    pub failed_passes: u64,
    /// New findings recorded across all passes.
    pub new_findings: u64,
    /// Brute-force alerts written across all passes.
    pub alerts: u64,
}

/// Run passes on an interval until Ctrl-C or the handle fires.
///
/// A failing pass is logged and the loop continues; a router that is briefly
/// unreachable must not kill the watcher.
///
/// # Errors
///
/// Never fails mid-loop; the Result covers future teardown paths and keeps
/// the signature uniform with [`run_pass`].
pub async fn watch(
    source: &mut dyn LogSource,
    config: &Config,
    detector: &Detector,
    options: PassOptions,
    handle: &WatchHandle,
) -> Result<WatchSummary> {
    let period = config.watch_interval();
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; consume it so the first pass
    // starts right away and later ticks land a full period apart.
    ticker.tick().await;

    // Listen for Ctrl-C on a dedicated task so an interrupt that arrives
    // while a pass is in flight still lands; a handler created fresh inside
    // the interval wait would miss it.
    let interrupt = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping watch");
            interrupt.stop();
        }
    });

    info!(interval_secs = period.as_secs(), "watch started");
    let mut summary = WatchSummary::default();

    loop {
        if handle.should_stop() {
            break;
        }

        summary.passes += 1;
        match run_pass(source, config, detector, options).await {
            Ok(outcome) => {
                summary.new_findings += outcome.new_findings.len() as u64;
                if outcome.alert_path.is_some() {
                    summary.alerts += 1;
                }
                info!(
                    pass = summary.passes,
                    new = outcome.new_findings.len(),
                    brute_hits = outcome.brute_hits.len(),
                    "pass complete"
                );
            }
            Err(e) => {
                summary.failed_passes += 1;
                warn!(pass = summary.passes, error = %e, "pass failed, retrying next interval");
            }
        }

        if handle.should_stop() {
            break;
        }
        tokio::select! {
            _ = ticker.tick() => {}
            () = handle.stopped() => {}
        }
    }

    info!(
        passes = summary.passes,
        failed = summary.failed_passes,
        "watch stopped"
    );
    Ok(summary)
}
