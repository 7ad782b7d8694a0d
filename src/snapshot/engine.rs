//! Per-share backup state machine.
//!
//! One run for one share walks
//! `WeeklyGate → CheckExistence → Init → Create → Link → Replicate →
//! Rotate`, with `Skip` as an early exit from the first two states.
//! Only `Create` is terminal on failure: a share with no current
//! snapshot has nothing to replicate or rotate against. Everything
//! after a successful create is best-effort — link, replication, and
//! rotation problems go to the [`Reporter`] and the run completes so a
//! flaky remote host never blocks local data protection.
//!
//! The weekly gate is evaluated before the dataset existence check so a
//! gated weekly share costs zero external commands.

use std::fs;
use std::path::Path;

use chrono::{Datelike, NaiveDate};

use crate::config::{BackupPolicy, RetentionUnit, Share};
use crate::error::{Error, Result};
use crate::report::Reporter;

use super::dates::{format_date, snapshot_name, BackupDates, BACKUP_WEEKDAY};
use super::zfs::SnapshotStore;

/// Name of the browsable snapshot link inside each share mount point.
pub const BACKUP_LINK: &str = "___backups___";

/// Where a share's run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Weekly share, and today is not the backup weekday.
    WrongWeekday,
    /// The share's dataset does not exist on this host.
    MissingDataset,
}

/// Drives the state machine for one share at a time.
pub struct Engine<'a, S: SnapshotStore> {
    store: &'a S,
    reporter: &'a dyn Reporter,
    policy: BackupPolicy,
}

impl<'a, S: SnapshotStore> Engine<'a, S> {
    pub fn new(store: &'a S, reporter: &'a dyn Reporter, policy: BackupPolicy) -> Self {
        Self {
            store,
            reporter,
            policy,
        }
    }

    /// Forward an error to the observability sink.
    pub fn report(&self, context: &str, error: &Error) {
        self.reporter.report(context, error);
    }

    /// Run the full state machine for one share.
    ///
    /// `today` is the batch-start date, captured once by the caller so
    /// every share in a batch agrees on it.
    ///
    /// # Errors
    ///
    /// Returns an error only when snapshot creation fails; all later
    /// states report and swallow their failures.
    pub fn run_share(&self, share: &Share, today: NaiveDate) -> Result<Outcome> {
        if share.retention_unit == RetentionUnit::Week && today.weekday() != BACKUP_WEEKDAY {
            return Ok(Outcome::Skipped(SkipReason::WrongWeekday));
        }
        if !self.store.dataset_exists(&share.dataset) {
            tracing::warn!(
                share = %share.name,
                dataset = %share.dataset,
                "dataset missing, share skipped"
            );
            return Ok(Outcome::Skipped(SkipReason::MissingDataset));
        }

        let dates = BackupDates::compute(today, share.retention_unit, share.retention_count);

        self.create(share, dates)?;

        if let Err(err) = self.link(&share.path) {
            self.reporter.report(&share.name, &err);
        }
        if share.remote_enabled {
            if let Err(err) = self.replicate(share, dates) {
                self.reporter.report(&share.name, &err);
            }
        }
        if let Err(err) = self.rotate(share, dates) {
            self.reporter.report(&share.name, &err);
        }

        Ok(Outcome::Done)
    }

    /// Create today's snapshot if it does not already exist.
    fn create(&self, share: &Share, dates: BackupDates) -> Result<()> {
        let current = snapshot_name(&share.dataset, dates.current);
        if self.store.snapshot_exists(&current) {
            tracing::debug!(snapshot = %current, "snapshot already exists");
            return Ok(());
        }
        self.store.create_snapshot(&current)
    }

    /// Ensure the browsable `___backups___` link points at the ZFS
    /// snapshot directory.
    fn link(&self, mount: &Path) -> Result<()> {
        let link = mount.join(BACKUP_LINK);
        if fs::symlink_metadata(&link).is_ok() {
            return Ok(());
        }
        std::os::unix::fs::symlink(".zfs/snapshot", &link)?;
        Ok(())
    }

    /// Replicate today's snapshot to the share's remote host.
    ///
    /// Skips silently when the snapshot directory is not visible yet;
    /// retries per policy before giving up.
    fn replicate(&self, share: &Share, dates: BackupDates) -> Result<()> {
        if !self
            .store
            .snapshot_visible(&share.path, &format_date(dates.current))
        {
            tracing::debug!(
                share = %share.name,
                "current snapshot not yet visible, replication skipped"
            );
            return Ok(());
        }

        let mut attempt = 0;
        loop {
            match self.replicate_once(share, dates) {
                Ok(()) => return Ok(()),
                Err(err) if attempt < self.policy.replication_retries => {
                    attempt += 1;
                    tracing::warn!(
                        share = %share.name,
                        attempt,
                        error = %err,
                        "replication failed, retrying"
                    );
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// One replication attempt: incremental when both sides still hold
    /// the previous snapshot, otherwise rebuild the remote dataset and
    /// send a full stream.
    fn replicate_once(&self, share: &Share, dates: BackupDates) -> Result<()> {
        let current = snapshot_name(&share.dataset, dates.current);
        let previous = snapshot_name(&share.dataset, dates.previous);
        let remote_dataset = share.remote_dataset();
        let remote_previous = format!("{remote_dataset}@{}", format_date(dates.previous));
        let host = &share.remote_host;

        let remote_dataset_exists = self.store.remote_exists(host, &remote_dataset);
        if remote_dataset_exists
            && self.store.remote_exists(host, &remote_previous)
            && self.store.snapshot_exists(&previous)
        {
            return self
                .store
                .send_incremental(&previous, &current, host, &remote_dataset);
        }

        // No usable increment base: force a clean baseline.
        if remote_dataset_exists {
            self.store.destroy_remote(host, &remote_dataset)?;
        }
        self.store.create_remote_dataset(host, &remote_dataset)?;
        self.store.send_full(&current, host, &remote_dataset)
    }

    /// Destroy the snapshot at the retention boundary, locally and on
    /// the remote. Never touches the snapshot created this run.
    fn rotate(&self, share: &Share, dates: BackupDates) -> Result<()> {
        if dates.rotation == dates.current {
            return Ok(());
        }

        let rotation = snapshot_name(&share.dataset, dates.rotation);
        if self.store.snapshot_exists(&rotation) {
            self.store.destroy_snapshot(&rotation)?;
        }

        if share.remote_enabled {
            let remote_rotation =
                format!("{}@{}", share.remote_dataset(), format_date(dates.rotation));
            if self.store.remote_exists(&share.remote_host, &remote_rotation) {
                self.store
                    .destroy_remote(&share.remote_host, &remote_rotation)?;
            }
        }
        Ok(())
    }
}
