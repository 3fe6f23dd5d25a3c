//! The master CSV ledger of failed logins.
//!
//! This module owns `failed_logins_master.csv`: loading it, deduplicating
//! new findings against it, and appending rows. The file is the tool's only
//! state; deleting it resets the monitor.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::{debug, info};

use crate::detect::extract_ip;
use crate::error::{Error, Result};
use crate::event::Finding;

/// The ledger's header row. Column order matches the records the tool has
/// always written, so existing files keep loading.
pub const LEDGER_HEADER: &str = "time,message,topics,id";

/// The master CSV ledger.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    findings: Vec<Finding>,
    ids: HashSet<String>,
}

impl Ledger {
    /// Load the ledger at `path`.
    ///
    /// A missing file yields an empty ledger (a fresh start). A file that is
    /// present but does not parse as a routewatch ledger yields
    /// [`Error::LedgerCorrupt`], which tells the operator the file can be
    /// deleted to reset state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LedgerCorrupt`] on a bad header or row and
    /// [`Error::Io`] if the file cannot be read.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            debug!(path = %path.display(), "no ledger file, starting empty");
            return Ok(Self {
                path,
                findings: Vec::new(),
                ids: HashSet::new(),
            });
        }

        let text = fs::read_to_string(&path)?;
        // An empty file behaves like a missing one.
        if text.trim().is_empty() {
            debug!(path = %path.display(), "empty ledger file, starting empty");
            return Ok(Self {
                path,
                findings: Vec::new(),
                ids: HashSet::new(),
            });
        }

        let (header, body) = match text.split_once('\n') {
            Some((header, body)) => (header, body),
            None => (text.as_str(), ""),
        };
        if header.trim_end() != LEDGER_HEADER {
            return Err(Error::ledger_corrupt(
                &path,
                format!("unexpected header {header:?}"),
            ));
        }

        let mut findings = Vec::new();
        let mut ids = HashSet::new();
        for (body_line, mut fields) in parse_csv_records(body) {
            if fields.len() != 4 {
                return Err(Error::ledger_corrupt(
                    &path,
                    format!(
                        "row {} has {} fields, expected 4",
                        body_line + 1,
                        fields.len()
                    ),
                ));
            }
            let fingerprint = fields.pop().unwrap_or_default();
            let topics = fields.pop().unwrap_or_default();
            let message = fields.pop().unwrap_or_default();
            let time = fields.pop().unwrap_or_default();
            ids.insert(fingerprint.clone());
            findings.push(Finding::from_row(time, message, topics, fingerprint));
        }

        debug!(path = %path.display(), rows = findings.len(), "loaded ledger");
        Ok(Self {
            path,
            findings,
            ids,
        })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if a fingerprint is already recorded.
    #[must_use]
    pub fn contains(&self, fingerprint: &str) -> bool {
        self.ids.contains(fingerprint)
    }

    /// Every finding currently in the ledger, in file order.
    #[must_use]
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    /// Number of recorded findings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.findings.len()
    }

    /// Check if the ledger holds no findings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    /// Append findings to the backing file and to this ledger.
    ///
    /// The caller decides what is new; repeated fingerprints inside `new`
    /// are all written, so same-second repeat attempts stay countable.
    /// Writes the header first when the file is new or empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be opened or written.
    pub fn append(&mut self, new: &[Finding]) -> Result<usize> {
        if new.is_empty() {
            return Ok(0);
        }

        let fresh = match fs::metadata(&self.path) {
            Ok(meta) => meta.len() == 0,
            Err(_) => true,
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        if fresh {
            writeln!(file, "{LEDGER_HEADER}")?;
        }
        for finding in new {
            writeln!(file, "{}", csv_row(finding))?;
        }

        for finding in new {
            self.ids.insert(finding.fingerprint.clone());
            self.findings.push(finding.clone());
        }
        info!(path = %self.path.display(), appended = new.len(), "recorded findings");
        Ok(new.len())
    }

    /// Summary statistics for the `status` command.
    #[must_use]
    pub fn stats(&self) -> LedgerStats {
        let distinct_ips = self
            .findings
            .iter()
            .filter_map(|f| extract_ip(&f.message))
            .collect::<HashSet<_>>()
            .len();
        let mut times = self.findings.iter().filter_map(Finding::parsed_time);
        let first = times.next();
        let (oldest, newest) = times.fold((first, first), |(lo, hi), t| {
            (lo.map(|v| v.min(t)), hi.map(|v| v.max(t)))
        });
        let file_size = fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);

        LedgerStats {
            total: self.findings.len(),
            distinct_ips,
            oldest,
            newest,
            file_size,
        }
    }
}

/// Summary of a ledger's contents.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LedgerStats {
    /// Total recorded findings.
    pub total: usize,
    /// Distinct source addresses across all findings.
    pub distinct_ips: usize,
    /// Oldest parseable finding timestamp.
    pub oldest: Option<NaiveDateTime>,
    /// Newest parseable finding timestamp.
    pub newest: Option<NaiveDateTime>,
    /// Size of the backing file in bytes.
    pub file_size: u64,
}

/// Render one finding as a ledger CSV row.
#[must_use]
pub fn csv_row(finding: &Finding) -> String {
    format!(
        "{},{},{},{}",
        csv_escape(&finding.time),
        csv_escape(&finding.message),
        csv_escape(&finding.topics),
        csv_escape(&finding.fingerprint)
    )
}

/// Escape a value for CSV: wrap in quotes if it contains comma, quote, or newline.
fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Parse CSV records, handling quoted fields. A quoted field may span line
/// breaks (router log messages can carry them), so records are delimited by
/// unquoted newlines, not by [`str::lines`]. Returns each record with the
/// 1-based physical line it starts on; blank lines are skipped.
fn parse_csv_records(text: &str) -> Vec<(usize, Vec<String>)> {
    let mut records = Vec::new();
    let mut fields: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut saw_quote = false;
    let mut line = 1;
    let mut record_line = 1;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    // Escaped quote.
                    current.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    current.push(ch);
                }
                _ => current.push(ch),
            }
        } else {
            match ch {
                '"' => {
                    in_quotes = true;
                    saw_quote = true;
                }
                ',' => fields.push(std::mem::take(&mut current)),
                '\n' => {
                    line += 1;
                    if fields.is_empty() && current.trim().is_empty() && !saw_quote {
                        // Blank line.
                        current.clear();
                    } else {
                        fields.push(std::mem::take(&mut current));
                        records.push((record_line, std::mem::take(&mut fields)));
                    }
                    saw_quote = false;
                    record_line = line;
                }
                '\r' if chars.peek() == Some(&'\n') => {}
                _ => current.push(ch),
            }
        }
    }
    if !(fields.is_empty() && current.trim().is_empty() && !saw_quote) {
        fields.push(current);
        records.push((record_line, fields));
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::LogEntry;

    fn temp_ledger_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "routewatch_ledger_{}_{}.csv",
            name,
            std::process::id()
        ))
    }

    fn finding(time: &str, message: &str) -> Finding {
        Finding::new(&LogEntry::new(time, "system,error,critical", message))
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let ledger = Ledger::load("/nonexistent/failed_logins_master.csv").unwrap();
        assert!(ledger.is_empty());
        assert_eq!(ledger.len(), 0);
    }

    #[test]
    fn test_append_then_reload() {
        let path = temp_ledger_path("roundtrip");
        fs::remove_file(&path).ok();

        let mut ledger = Ledger::load(&path).unwrap();
        let rows = vec![
            finding("10:00:00", "login failure for user admin from 192.0.2.7"),
            finding("10:00:30", "login failure for user root from 192.0.2.7"),
        ];
        assert_eq!(ledger.append(&rows).unwrap(), 2);

        let reloaded = Ledger::load(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.contains(&rows[0].fingerprint));
        assert!(reloaded.contains(&rows[1].fingerprint));
        assert_eq!(reloaded.findings()[0].time, "10:00:00");
    }

    #[test]
    fn test_append_writes_header_once() {
        let path = temp_ledger_path("header");
        fs::remove_file(&path).ok();

        let mut ledger = Ledger::load(&path).unwrap();
        ledger.append(&[finding("10:00:00", "denied once")]).unwrap();
        ledger.append(&[finding("10:01:00", "denied twice")]).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        fs::remove_file(&path).ok();

        let headers = text
            .lines()
            .filter(|l| *l == LEDGER_HEADER)
            .count();
        assert_eq!(headers, 1);
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn test_append_empty_batch_writes_nothing() {
        let path = temp_ledger_path("empty_batch");
        fs::remove_file(&path).ok();

        let mut ledger = Ledger::load(&path).unwrap();
        assert_eq!(ledger.append(&[]).unwrap(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn test_fields_with_commas_and_quotes_survive() {
        let path = temp_ledger_path("escaping");
        fs::remove_file(&path).ok();

        let tricky = finding(
            "10:00:00",
            r#"login failure for user "ad,min" from 192.0.2.7 via api"#,
        );
        let mut ledger = Ledger::load(&path).unwrap();
        ledger.append(std::slice::from_ref(&tricky)).unwrap();

        let reloaded = Ledger::load(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(reloaded.findings()[0].message, tricky.message);
        assert_eq!(reloaded.findings()[0].fingerprint, tricky.fingerprint);
    }

    #[test]
    fn test_multiline_message_round_trips() {
        let path = temp_ledger_path("multiline");
        fs::remove_file(&path).ok();

        // Log text is attacker-influenced; a line break inside a message
        // must not wedge every later load of the ledger.
        let tricky = finding(
            "10:00:00",
            "login failure for user admin\nfrom 192.0.2.7 via api",
        );
        let mut ledger = Ledger::load(&path).unwrap();
        ledger.append(std::slice::from_ref(&tricky)).unwrap();
        ledger
            .append(&[finding("10:01:00", "login failure for user root via ssh")])
            .unwrap();

        let reloaded = Ledger::load(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.findings()[0].message, tricky.message);
        assert!(reloaded.contains(&tricky.fingerprint));
        assert_eq!(reloaded.findings()[1].time, "10:01:00");
    }

    #[test]
    fn test_duplicate_fingerprints_in_one_batch_are_all_written() {
        let path = temp_ledger_path("dupes");
        fs::remove_file(&path).ok();

        let row = finding("10:00:00", "login failure from 192.0.2.7");
        let mut ledger = Ledger::load(&path).unwrap();
        ledger.append(&[row.clone(), row.clone()]).unwrap();

        let reloaded = Ledger::load(&path).unwrap();
        fs::remove_file(&path).ok();
        assert_eq!(reloaded.len(), 2);
    }

    #[test]
    fn test_load_rejects_wrong_header() {
        let path = temp_ledger_path("bad_header");
        fs::write(&path, "totally,different,columns\n").unwrap();

        let err = Ledger::load(&path).unwrap_err();
        fs::remove_file(&path).ok();

        assert!(err.is_ledger_corrupt());
        assert!(err.to_string().contains("header"));
    }

    #[test]
    fn test_load_rejects_short_row() {
        let path = temp_ledger_path("bad_row");
        fs::write(&path, format!("{LEDGER_HEADER}\nonly,three,fields\n")).unwrap();

        let err = Ledger::load(&path).unwrap_err();
        fs::remove_file(&path).ok();

        assert!(err.is_ledger_corrupt());
        assert!(err.to_string().contains("row 2"));
    }

    #[test]
    fn test_load_empty_file() {
        let path = temp_ledger_path("empty_file");
        fs::write(&path, "").unwrap();

        let ledger = Ledger::load(&path).unwrap();
        fs::remove_file(&path).ok();
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_stats() {
        let path = temp_ledger_path("stats");
        fs::remove_file(&path).ok();

        let mut ledger = Ledger::load(&path).unwrap();
        ledger
            .append(&[
                finding("2024-03-14 08:00:00", "login failure from 192.0.2.7"),
                finding("2024-03-14 09:00:00", "login failure from 192.0.2.7"),
                finding("2024-03-14 10:00:00", "login failure from 10.0.0.5"),
                finding("bad time", "login failure via console"),
            ])
            .unwrap();

        let stats = ledger.stats();
        fs::remove_file(&path).ok();

        assert_eq!(stats.total, 4);
        assert_eq!(stats.distinct_ips, 2);
        assert_eq!(
            stats.oldest.unwrap().to_string(),
            "2024-03-14 08:00:00"
        );
        assert_eq!(
            stats.newest.unwrap().to_string(),
            "2024-03-14 10:00:00"
        );
        assert!(stats.file_size > 0);
    }

    #[test]
    fn test_csv_escape() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_parse_csv_records() {
        let records = parse_csv_records("a,b,c\nd,\"e,f\",g\n");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], (1, vec!["a".into(), "b".into(), "c".into()]));
        assert_eq!(records[1].0, 2);
        assert_eq!(records[1].1[1], "e,f");
    }

    #[test]
    fn test_parse_csv_records_quoted_newline() {
        let records = parse_csv_records("a,\"line one\nline two\",c\nd,e,f\n");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].1[1], "line one\nline two");
        // The second record starts after the two physical lines of the first.
        assert_eq!(records[1].0, 3);
    }

    #[test]
    fn test_parse_csv_records_skips_blank_lines() {
        let records = parse_csv_records("a,b\n\n\nc,d");
        assert_eq!(records.len(), 2);
        assert_eq!(records[1], (4, vec!["c".into(), "d".into()]));
    }
}
