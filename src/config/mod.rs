//! Agent configuration.
//!
//! hostkeeper reads one JSON settings file (default
//! `/etc/hostkeeper/agent.json`, overridable with `--config` or
//! `HOSTKEEPER_CONFIG`). It declares:
//!
//! - **domains**: the config namespaces the agent manages (dhcp, smtp,
//!   squid, samba, …), each with a temp dir for artifact state, a live
//!   dir the service reads from, and an optional post-commit command
//!   (service restart, `newaliases`, proxy reconfigure).
//! - **shares**: the filesystems under snapshot backup.
//! - **backup**: command timeout and replication retry policy.
//!
//! The file is validated on load; a broken config never reaches the
//! transaction or snapshot layers.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Snapshot retention granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetentionUnit {
    Day,
    Week,
}

impl RetentionUnit {
    /// Length of one retention period in days.
    #[must_use]
    pub const fn period_days(self) -> i64 {
        match self {
            Self::Day => 1,
            Self::Week => 7,
        }
    }
}

/// One config namespace managed by the transaction store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Domain {
    pub name: String,
    /// Directory holding `<artifact>.head`, `<artifact>.recv`,
    /// `<artifact>.recv.backup`.
    pub temp_dir: PathBuf,
    /// Directory the service reads assembled files from.
    pub live_dir: PathBuf,
    /// Command (argv) run after a successful commit, e.g.
    /// `["/usr/bin/systemctl", "restart", "dhcpd.service"]`.
    #[serde(default)]
    pub post_commit: Vec<String>,
}

/// One filesystem/dataset under snapshot backup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Share {
    pub name: String,
    /// Mount point; the `___backups___` link and `.zfs/snapshot` live here.
    pub path: PathBuf,
    /// ZFS dataset identifier, e.g. `tank/docs`.
    pub dataset: String,
    #[serde(default)]
    pub remote_host: String,
    #[serde(default)]
    pub remote_pool: String,
    pub retention_count: u32,
    pub retention_unit: RetentionUnit,
    #[serde(default)]
    pub remote_enabled: bool,
}

impl Share {
    /// The remote dataset this share replicates into.
    #[must_use]
    pub fn remote_dataset(&self) -> String {
        format!("{}/{}", self.remote_pool, self.name)
    }
}

/// Timeout and retry policy for the backup run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupPolicy {
    /// Wall-clock bound for every external command, replication sends
    /// included.
    #[serde(default = "default_timeout_secs")]
    pub command_timeout_secs: u64,
    /// Extra attempts for a failed replication before it is logged and
    /// swallowed. 0 keeps the single-attempt behavior.
    #[serde(default)]
    pub replication_retries: u32,
}

const fn default_timeout_secs() -> u64 {
    600
}

/// Whether a name is safe to splice into a zfs/ssh command line.
///
/// Share names, datasets, hosts, and pools end up inside a `bash -c`
/// replication pipeline, so anything outside this set is rejected at
/// load time rather than quoted at use time.
fn shell_safe(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '_' | '-' | '.' | ':' | '@'))
}

impl Default for BackupPolicy {
    fn default() -> Self {
        Self {
            command_timeout_secs: default_timeout_secs(),
            replication_retries: 0,
        }
    }
}

/// Root of the agent settings file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub domains: Vec<Domain>,
    #[serde(default)]
    pub shares: Vec<Share>,
    #[serde(default)]
    pub backup: Option<BackupPolicy>,
}

impl AgentConfig {
    /// Load and validate the settings file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read,
    /// [`Error::Json`] if it does not parse, or [`Error::Config`] if
    /// validation fails.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first violation found.
    pub fn validate(&self) -> Result<()> {
        for (i, domain) in self.domains.iter().enumerate() {
            if domain.name.is_empty() {
                return Err(Error::Config(format!("domain #{i}: empty name")));
            }
            if self.domains[..i].iter().any(|d| d.name == domain.name) {
                return Err(Error::Config(format!(
                    "duplicate domain name: {}",
                    domain.name
                )));
            }
        }
        for (i, share) in self.shares.iter().enumerate() {
            if share.name.is_empty() {
                return Err(Error::Config(format!("share #{i}: empty name")));
            }
            if share.dataset.is_empty() {
                return Err(Error::Config(format!(
                    "share {}: empty dataset",
                    share.name
                )));
            }
            if !shell_safe(&share.name) {
                return Err(Error::Config(format!(
                    "share {}: name contains unsupported characters",
                    share.name
                )));
            }
            if !shell_safe(&share.dataset) {
                return Err(Error::Config(format!(
                    "share {}: dataset contains unsupported characters: {}",
                    share.name, share.dataset
                )));
            }
            if self.shares[..i].iter().any(|s| s.name == share.name) {
                return Err(Error::Config(format!(
                    "duplicate share name: {}",
                    share.name
                )));
            }
            if share.remote_enabled {
                if share.remote_host.is_empty() || share.remote_pool.is_empty() {
                    return Err(Error::Config(format!(
                        "share {}: remote backup enabled without remote_host/remote_pool",
                        share.name
                    )));
                }
                if !shell_safe(&share.remote_host) || !shell_safe(&share.remote_pool) {
                    return Err(Error::Config(format!(
                        "share {}: remote_host/remote_pool contain unsupported characters",
                        share.name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Effective backup policy (defaults applied).
    #[must_use]
    pub fn backup_policy(&self) -> BackupPolicy {
        self.backup.clone().unwrap_or_default()
    }

    /// Look up a domain by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownDomain`] if no domain matches.
    pub fn domain(&self, name: &str) -> Result<&Domain> {
        self.domains
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| Error::UnknownDomain(name.to_string()))
    }

    /// Look up a share by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownShare`] if no share matches.
    pub fn share(&self, name: &str) -> Result<&Share> {
        self.shares
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| Error::UnknownShare(name.to_string()))
    }
}
