//! `routewatch-routeros` - A minimal async client for the MikroTik RouterOS API
//!
//! This library speaks the word-and-sentence protocol of the RouterOS API
//! service (TCP port 8728): plaintext login as used since RouterOS 6.43,
//! one command at a time, replies collected until the router's `!done`.
//! It covers exactly what a log poller needs and nothing more.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod client;
pub mod codec;
pub mod command;
pub mod error;
pub mod reply;

pub use client::Connection;
pub use command::Command;
pub use error::{Error, Result};
pub use reply::{Reply, Response};
