//! Command-line interface for hostkeeper.
//!
//! The CLI is the thin boundary in front of the core: the management
//! server (or cron) invokes it with an already-decided operation and a
//! payload; routing, authentication, and payload decoding live outside
//! this binary.

pub mod commands;

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

/// Top-level CLI arguments.
#[derive(Parser)]
#[command(
    name = "hostkeeper",
    version,
    about = "Config distribution and share backup agent"
)]
pub struct Cli {
    /// Path to the agent settings file
    #[arg(
        long,
        global = true,
        env = "HOSTKEEPER_CONFIG",
        default_value = "/etc/hostkeeper/agent.json"
    )]
    pub config: PathBuf,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all log output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Apply one edit operation to a config artifact and commit it
    Apply {
        /// Config domain (as named in the settings file)
        domain: String,
        /// Artifact name, e.g. `dhcpd.conf`
        artifact: String,
        /// Edit operation kind
        #[arg(long, value_enum)]
        op: OpKind,
        /// Read the payload from a file instead of stdin
        #[arg(long)]
        payload_file: Option<PathBuf>,
    },

    /// Manage artifact files themselves (rename/remove)
    Artifact {
        #[command(subcommand)]
        command: ArtifactCommand,
    },

    /// Run one backup pass over all configured shares
    Backup,

    /// Provision share datasets
    Share {
        #[command(subcommand)]
        command: ShareCommand,
    },

    /// Load and validate the settings file
    Validate,
}

/// Edit operation kinds, decided by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OpKind {
    /// Replace the whole draft with the payload (full re-download)
    Overwrite,
    /// Append the payload to the draft
    Append,
    /// Payload is a JSON object of key → replacement line(s)
    Update,
    /// Payload is a JSON array of keys to delete
    Delete,
}

#[derive(Subcommand)]
pub enum ArtifactCommand {
    /// Rename an artifact's head, draft, and live file
    Rename {
        domain: String,
        from: String,
        to: String,
    },
    /// Remove an artifact's head, draft, and live file
    Remove { domain: String, name: String },
}

#[derive(Subcommand)]
pub enum ShareCommand {
    /// Create the backing dataset/directory for a configured share
    Create {
        /// Share name (as named in the settings file)
        name: String,
        /// refquota for the new dataset, e.g. `100G`
        #[arg(long)]
        quota: Option<String>,
        /// Create a plain directory instead of a ZFS dataset
        #[arg(long)]
        directory: bool,
    },
    /// Change the refquota of a share's dataset
    Quota { name: String, quota: String },
    /// Destroy a share's dataset and its remote replica
    Destroy { name: String },
}
