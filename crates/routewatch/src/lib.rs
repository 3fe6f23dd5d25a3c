//! `routewatch` - Failed-login and brute-force monitoring for MikroTik routers
//!
//! This library polls a RouterOS device's log over its API, classifies
//! failed-login entries, records them in a master CSV ledger, and sweeps new
//! findings for brute-force bursts.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod detect;
pub mod error;
pub mod event;
pub mod ledger;
pub mod logging;
pub mod monitor;
pub mod report;

pub use config::Config;
pub use detect::{BruteForceHit, Detector};
pub use error::{Error, Result};
pub use event::{Finding, LogEntry, LogSource};
pub use ledger::{Ledger, LedgerStats};
pub use logging::init_logging;
pub use monitor::{PassOptions, PassOutcome, RouterSource, WatchHandle};
