//! Core event types for routewatch.
//!
//! This module defines the fundamental data structures for representing
//! router log entries and the failed-login findings derived from them.

use std::collections::HashMap;

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One row of the router's log, as returned by `/log/print`.
///
/// RouterOS omits attributes it has no value for, so every field except the
/// internal id defaults to an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// RouterOS internal entry id (`.id`), when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Log timestamp as the router printed it.
    pub time: String,

    /// Comma-separated topic list (e.g. `system,error,critical`).
    pub topics: String,

    /// The log message text.
    pub message: String,
}

impl LogEntry {
    /// Create a log entry from its parts.
    #[must_use]
    pub fn new(
        time: impl Into<String>,
        topics: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            time: time.into(),
            topics: topics.into(),
            message: message.into(),
        }
    }

    /// Build a log entry from the attribute map of one `!re` reply.
    #[must_use]
    pub fn from_attrs(attrs: &HashMap<String, String>) -> Self {
        let field = |name: &str| attrs.get(name).cloned().unwrap_or_default();
        Self {
            id: attrs.get(".id").cloned(),
            time: field("time"),
            topics: field("topics"),
            message: field("message"),
        }
    }
}

/// A failed-login record destined for the master CSV.
///
/// The fingerprint is `{time}|{message}`, which doubles as the ledger's `id`
/// column and its deduplication key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Log timestamp as the router printed it.
    pub time: String,

    /// The log message text.
    pub message: String,

    /// Comma-separated topic list.
    pub topics: String,

    /// Deduplication key, `{time}|{message}`.
    pub fingerprint: String,
}

impl Finding {
    /// Create a finding from a matched log entry.
    ///
    /// Computes the fingerprint from the entry's time and message.
    #[must_use]
    pub fn new(entry: &LogEntry) -> Self {
        Self {
            time: entry.time.clone(),
            message: entry.message.clone(),
            topics: entry.topics.clone(),
            fingerprint: format!("{}|{}", entry.time, entry.message),
        }
    }

    /// Rebuild a finding from a ledger row, keeping the stored fingerprint.
    #[must_use]
    pub fn from_row(time: String, message: String, topics: String, fingerprint: String) -> Self {
        Self {
            time,
            message,
            topics,
            fingerprint,
        }
    }

    /// Parse this finding's timestamp, if the router printed it in a
    /// recognized format.
    #[must_use]
    pub fn parsed_time(&self) -> Option<NaiveDateTime> {
        parse_log_time(&self.time)
    }
}

/// Parse a RouterOS log timestamp.
///
/// Routers print log times in several shapes depending on version and entry
/// age: `HH:MM:SS` for today, `mmm/dd HH:MM:SS` for the current year,
/// `mmm/dd/yyyy HH:MM:SS` for older entries, and `YYYY-MM-DD HH:MM:SS` on v7.
/// Returns `None` for anything else; such findings are still recorded but
/// cannot take part in time-window math.
#[must_use]
pub fn parse_log_time(raw: &str) -> Option<NaiveDateTime> {
    parse_log_time_on(raw, Local::now().date_naive())
}

/// Like [`parse_log_time`], with an explicit reference date for the formats
/// that omit one.
#[must_use]
pub fn parse_log_time_on(raw: &str, today: NaiveDate) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(time) = NaiveTime::parse_from_str(raw, "%H:%M:%S") {
        return Some(today.and_time(time));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%b/%d/%Y %H:%M:%S") {
        return Some(dt);
    }
    // Month/day without a year; assume the reference date's year.
    let with_year = format!("{} {raw}", today.year());
    if let Ok(dt) = NaiveDateTime::parse_from_str(&with_year, "%Y %b/%d %H:%M:%S") {
        return Some(dt);
    }
    None
}

/// A source of router log entries.
///
/// Implemented by the live RouterOS connection and by in-memory sources in
/// tests. A fetch returns the full log as the router currently holds it;
/// deduplication against earlier passes happens downstream.
#[async_trait::async_trait]
pub trait LogSource: Send + Sync {
    /// Name of this source (for logging).
    fn name(&self) -> &str;

    /// Fetch the current log entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be reached or refuses the fetch.
    async fn fetch(&mut self) -> Result<Vec<LogEntry>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    #[test]
    fn test_log_entry_from_attrs() {
        let mut attrs = HashMap::new();
        attrs.insert(".id".to_string(), "*1a".to_string());
        attrs.insert("time".to_string(), "10:02:33".to_string());
        attrs.insert("topics".to_string(), "system,error,critical".to_string());
        attrs.insert(
            "message".to_string(),
            "login failure for user admin from 192.0.2.7 via api".to_string(),
        );

        let entry = LogEntry::from_attrs(&attrs);
        assert_eq!(entry.id.as_deref(), Some("*1a"));
        assert_eq!(entry.time, "10:02:33");
        assert_eq!(entry.topics, "system,error,critical");
        assert!(entry.message.contains("login failure"));
    }

    #[test]
    fn test_log_entry_from_attrs_missing_fields() {
        let entry = LogEntry::from_attrs(&HashMap::new());
        assert!(entry.id.is_none());
        assert_eq!(entry.time, "");
        assert_eq!(entry.topics, "");
        assert_eq!(entry.message, "");
    }

    #[test]
    fn test_finding_fingerprint() {
        let entry = LogEntry::new("10:02:33", "system,error", "login failure for user admin");
        let finding = Finding::new(&entry);
        assert_eq!(
            finding.fingerprint,
            "10:02:33|login failure for user admin"
        );
    }

    #[test]
    fn test_finding_from_row_keeps_fingerprint() {
        let finding = Finding::from_row(
            "10:02:33".to_string(),
            "msg".to_string(),
            "system".to_string(),
            "stored|fingerprint".to_string(),
        );
        assert_eq!(finding.fingerprint, "stored|fingerprint");
    }

    #[test]
    fn test_parse_time_only() {
        let parsed = parse_log_time_on("10:02:33", reference_date()).unwrap();
        assert_eq!(
            parsed,
            reference_date()
                .and_time(NaiveTime::from_hms_opt(10, 2, 33).unwrap())
        );
    }

    #[test]
    fn test_parse_month_day() {
        let parsed = parse_log_time_on("jan/02 10:00:00", reference_date()).unwrap();
        assert_eq!(parsed.date(), NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(parsed.time(), NaiveTime::from_hms_opt(10, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_month_day_year() {
        let parsed = parse_log_time_on("dec/31/2023 23:59:59", reference_date()).unwrap();
        assert_eq!(
            parsed.date(),
            NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()
        );
    }

    #[test]
    fn test_parse_v7_style() {
        let parsed = parse_log_time_on("2024-03-14 08:15:00", reference_date()).unwrap();
        assert_eq!(parsed.date(), NaiveDate::from_ymd_opt(2024, 3, 14).unwrap());
    }

    #[test]
    fn test_parse_unrecognized_yields_none() {
        assert!(parse_log_time_on("", reference_date()).is_none());
        assert!(parse_log_time_on("yesterday", reference_date()).is_none());
        assert!(parse_log_time_on("10:02", reference_date()).is_none());
    }

    #[test]
    fn test_finding_parsed_time() {
        let entry = LogEntry::new("2024-03-14 08:15:00", "system", "denied");
        let finding = Finding::new(&entry);
        assert!(finding.parsed_time().is_some());

        let entry = LogEntry::new("not a time", "system", "denied");
        let finding = Finding::new(&entry);
        assert!(finding.parsed_time().is_none());
    }

    #[test]
    fn test_finding_serialize() {
        let entry = LogEntry::new("10:02:33", "system,error", "login failure");
        let finding = Finding::new(&entry);
        let json = serde_json::to_string(&finding).unwrap();
        assert!(json.contains("fingerprint"));
        assert!(json.contains("login failure"));
    }
}
