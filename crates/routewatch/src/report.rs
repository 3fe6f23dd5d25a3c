//! Per-pass report and alert files.
//!
//! Each pass that finds something writes a timestamped text report, and a
//! brute-force alert when the sweep flags addresses. Files land in the
//! configured report directory and can optionally be opened in the
//! platform's default viewer.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{info, warn};

use crate::detect::BruteForceHit;
use crate::error::{Error, Result};
use crate::event::Finding;

/// Timestamp slug used in report file names.
fn file_slug(now: DateTime<Local>) -> String {
    now.format("%Y-%m-%d_%H-%M").to_string()
}

/// Write the failed-login report for one pass.
///
/// The file is named `failed_logins_{YYYY-MM-DD_HH-MM}.txt` and lists the
/// pass's new findings.
///
/// # Errors
///
/// Returns [`Error::ReportWrite`] if the file cannot be written.
pub fn write_failed_login_report(
    dir: &Path,
    findings: &[Finding],
    now: DateTime<Local>,
) -> Result<PathBuf> {
    let path = dir.join(format!("failed_logins_{}.txt", file_slug(now)));

    let mut body = String::new();
    body.push_str("=== Failed Login Report ===\n");
    let _ = writeln!(body, "Generated: {}", now.format("%Y-%m-%d %H:%M:%S"));
    body.push('\n');
    for finding in findings {
        let _ = writeln!(
            body,
            "{}  [{}]  {}",
            finding.time, finding.topics, finding.message
        );
    }

    write_report_file(&path, &body)?;
    info!(path = %path.display(), findings = findings.len(), "wrote failed-login report");
    Ok(path)
}

/// Write the brute-force alert for one pass.
///
/// The file is named `brute_force_alert_{YYYY-MM-DD_HH-MM}.txt` and lists the
/// flagged addresses with their attempt counts.
///
/// # Errors
///
/// Returns [`Error::ReportWrite`] if the file cannot be written.
pub fn write_brute_force_alert(
    dir: &Path,
    hits: &[BruteForceHit],
    threshold: usize,
    window_minutes: u32,
    now: DateTime<Local>,
) -> Result<PathBuf> {
    let path = dir.join(format!("brute_force_alert_{}.txt", file_slug(now)));

    let mut body = String::new();
    body.push_str("=== BRUTE FORCE ALERT ===\n");
    let _ = writeln!(body, "Time: {}", now.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(
        body,
        "Threshold: {threshold} attempts in {window_minutes} minutes"
    );
    body.push('\n');
    body.push_str("Suspicious IPs:\n");
    for hit in hits {
        let _ = writeln!(
            body,
            "{} ({} attempts between {} and {})",
            hit.ip,
            hit.attempts,
            hit.first_seen.format("%H:%M:%S"),
            hit.last_seen.format("%H:%M:%S")
        );
    }

    write_report_file(&path, &body)?;
    info!(path = %path.display(), hits = hits.len(), "wrote brute-force alert");
    Ok(path)
}

fn write_report_file(path: &Path, body: &str) -> Result<()> {
    fs::write(path, body).map_err(|source| Error::ReportWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// Open a report in the platform's default viewer.
///
/// Failing to open is logged and otherwise ignored; a missing desktop
/// environment must not fail the pass.
pub fn open_in_viewer(path: &Path) {
    if let Err(e) = spawn_viewer(path) {
        warn!(path = %path.display(), error = %e, "could not open report in viewer");
    }
}

#[cfg(target_os = "macos")]
fn spawn_viewer(path: &Path) -> std::io::Result<()> {
    std::process::Command::new("open").arg(path).spawn()?;
    Ok(())
}

#[cfg(windows)]
fn spawn_viewer(path: &Path) -> std::io::Result<()> {
    std::process::Command::new("cmd")
        .args(["/C", "start", ""])
        .arg(path)
        .spawn()?;
    Ok(())
}

#[cfg(not(any(target_os = "macos", windows)))]
fn spawn_viewer(path: &Path) -> std::io::Result<()> {
    std::process::Command::new("xdg-open").arg(path).spawn()?;
    Ok(())
}
