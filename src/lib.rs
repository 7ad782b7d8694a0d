//! hostkeeper - config distribution and share backup agent
//!
//! This crate provides the core functionality for the `hostkeeper` binary,
//! which runs on file/infrastructure hosts and does two jobs:
//!
//! 1. Accepts already-parsed config edits (DHCP, mail relay, proxy,
//!    file-sharing) and commits them transactionally into the live
//!    service config files.
//! 2. Creates, links, replicates, and rotates daily/weekly ZFS snapshots
//!    of managed shares.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`config`] - Agent settings (domains, shares, backup policy)
//! - [`editor`] - Line-oriented edits on config drafts
//! - [`txn`] - Transactional draft/backup/commit protocol
//! - [`invoke`] - Synchronous external command execution
//! - [`snapshot`] - Per-share snapshot state machine and ZFS surface
//! - [`batch`] - One backup pass over all configured shares
//! - [`report`] - Error-observability sink
//! - [`error`] - Error types and exit-code mapping

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod batch;
pub mod cli;
pub mod config;
pub mod editor;
pub mod error;
pub mod invoke;
pub mod report;
pub mod snapshot;
pub mod txn;

pub use error::{Error, Result};
