//! Backup date arithmetic.
//!
//! The three dates that drive a share's run are pure functions of the
//! batch-start instant and the share's retention fields. They are
//! computed once per share and passed by value; nothing here is shared
//! mutable state, so a midnight boundary mid-batch cannot skew shares
//! against each other.

use chrono::{Duration, NaiveDate, Weekday};

use crate::config::RetentionUnit;

/// Snapshot names use `dataset@YYYY-MM-DD`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Weekly shares are backed up on this weekday only.
pub const BACKUP_WEEKDAY: Weekday = Weekday::Mon;

/// The date triple for one share's run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackupDates {
    /// Today; names the snapshot this run creates.
    pub current: NaiveDate,
    /// One period back; the incremental-send base.
    pub previous: NaiveDate,
    /// The retention boundary; the snapshot at this date is destroyed.
    pub rotation: NaiveDate,
}

impl BackupDates {
    /// Compute the triple from the batch-start date and retention policy.
    #[must_use]
    pub fn compute(today: NaiveDate, unit: RetentionUnit, count: u32) -> Self {
        let period = unit.period_days();
        Self {
            current: today,
            previous: today - Duration::days(period),
            rotation: today - Duration::days(period * i64::from(count)),
        }
    }
}

/// Format a date the way snapshot names carry it.
#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Full snapshot identifier for a dataset and date.
#[must_use]
pub fn snapshot_name(dataset: &str, date: NaiveDate) -> String {
    format!("{dataset}@{}", format_date(date))
}
