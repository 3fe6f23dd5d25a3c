//! Failed-login detection and brute-force analysis.
//!
//! This module classifies router log entries as failed logins, extracts
//! attacker addresses from their messages, and sweeps batches of findings
//! for brute-force bursts.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::OnceLock;

use chrono::NaiveDateTime;
use regex::Regex;
use tracing::debug;

use crate::config::DetectionConfig;
use crate::event::{Finding, LogEntry};

/// Dotted-quad candidates in a log message. Candidates still have to parse
/// as a real address, so `999.1.1.1` never becomes a finding's source.
const IPV4_PATTERN: &str = r"\b(?:[0-9]{1,3}\.){3}[0-9]{1,3}\b";

/// A built-in failed-login keyword.
#[derive(Debug)]
pub struct FailureKeyword {
    /// Name of the keyword for identification.
    pub name: &'static str,

    /// Description of what this keyword catches.
    pub description: &'static str,

    needle: &'static str,
}

impl FailureKeyword {
    /// The substring this keyword matches (lowercase).
    #[must_use]
    pub fn needle(&self) -> &'static str {
        self.needle
    }

    /// Check if a lowercased message contains this keyword.
    #[must_use]
    pub fn matches(&self, message_lower: &str) -> bool {
        message_lower.contains(self.needle)
    }
}

/// Get all built-in failure keywords.
#[must_use]
pub fn builtin_keywords() -> Vec<FailureKeyword> {
    vec![
        FailureKeyword {
            name: "login_failure",
            description: "RouterOS login failure messages (api, ssh, winbox, web)",
            needle: "login failure",
        },
        FailureKeyword {
            name: "failed",
            description: "Generic failure wording",
            needle: "failed",
        },
        FailureKeyword {
            name: "denied",
            description: "Access denied messages",
            needle: "denied",
        },
        FailureKeyword {
            name: "invalid",
            description: "Invalid user or credential messages",
            needle: "invalid",
        },
    ]
}

/// Extract the source address from a log message.
///
/// Returns the first dotted quad that parses as a valid IPv4 address, or
/// `None` when the message names no usable address.
#[must_use]
pub fn extract_ip(message: &str) -> Option<Ipv4Addr> {
    static IPV4: OnceLock<Regex> = OnceLock::new();
    let regex = IPV4.get_or_init(|| Regex::new(IPV4_PATTERN).expect("invalid IPv4 pattern"));
    regex
        .find_iter(message)
        .find_map(|m| m.as_str().parse().ok())
}

/// Classifies log entries as failed-login findings.
#[derive(Debug)]
pub struct Detector {
    keywords: Vec<String>,
    custom_regexes: Vec<Regex>,
}

impl Detector {
    /// Build a detector from detection configuration.
    ///
    /// Invalid custom patterns are skipped with a warning; configuration
    /// validation normally rejects them before this point.
    #[must_use]
    pub fn from_config(config: &DetectionConfig) -> Self {
        let keywords = config
            .failure_keywords
            .iter()
            .map(|k| k.to_lowercase())
            .collect();

        let custom_regexes = config
            .extra_patterns
            .iter()
            .filter_map(|p| match Regex::new(p) {
                Ok(r) => Some(r),
                Err(e) => {
                    tracing::warn!(pattern = %p, error = %e, "Invalid custom regex pattern");
                    None
                }
            })
            .collect();

        Self {
            keywords,
            custom_regexes,
        }
    }

    /// Check if a log message reads like a failed login.
    #[must_use]
    pub fn matches(&self, message: &str) -> bool {
        let lower = message.to_lowercase();
        if self.keywords.iter().any(|k| lower.contains(k.as_str())) {
            return true;
        }
        self.custom_regexes.iter().any(|r| r.is_match(message))
    }

    /// Turn the matching entries of a fetched log into findings.
    #[must_use]
    pub fn classify(&self, entries: &[LogEntry]) -> Vec<Finding> {
        let findings: Vec<Finding> = entries
            .iter()
            .filter(|e| self.matches(&e.message))
            .map(Finding::new)
            .collect();
        debug!(
            entries = entries.len(),
            matched = findings.len(),
            "classified log entries"
        );
        findings
    }
}

/// A source address whose attempts crossed the brute-force threshold.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct BruteForceHit {
    /// The suspicious address.
    pub ip: Ipv4Addr,

    /// Number of attempts inside the batch.
    pub attempts: usize,

    /// Earliest attempt timestamp.
    pub first_seen: NaiveDateTime,

    /// Latest attempt timestamp.
    pub last_seen: NaiveDateTime,
}

/// Sweep a batch of findings for brute-force bursts.
///
/// Attempts are grouped by extracted address; findings without a usable
/// address or a parseable timestamp are skipped. An address is reported when
/// it has at least `threshold` attempts and they all fall within `window`.
/// Hits are sorted by attempt count descending, then by address, so output
/// is deterministic.
#[must_use]
pub fn sweep(findings: &[Finding], threshold: usize, window: chrono::Duration) -> Vec<BruteForceHit> {
    let mut attempts: HashMap<Ipv4Addr, Vec<NaiveDateTime>> = HashMap::new();
    for finding in findings {
        let Some(ip) = extract_ip(&finding.message) else {
            continue;
        };
        let Some(time) = finding.parsed_time() else {
            continue;
        };
        attempts.entry(ip).or_default().push(time);
    }

    let mut hits = Vec::new();
    for (ip, times) in attempts {
        if times.len() < threshold {
            continue;
        }
        let (Some(&first_seen), Some(&last_seen)) = (times.iter().min(), times.iter().max())
        else {
            continue;
        };
        if last_seen - first_seen <= window {
            hits.push(BruteForceHit {
                ip,
                attempts: times.len(),
                first_seen,
                last_seen,
            });
        }
    }

    hits.sort_unstable_by(|a, b| b.attempts.cmp(&a.attempts).then_with(|| a.ip.cmp(&b.ip)));
    hits
}
