//! One backup pass over all configured shares.
//!
//! Shares are processed sequentially in config order. A share that
//! fails is reported and the pass moves on; the batch itself never
//! aborts. "Today" is captured once by the caller so every share in
//! the pass computes its dates from the same instant.

use chrono::NaiveDate;

use crate::config::Share;
use crate::snapshot::{Engine, Outcome, SnapshotStore};

/// Drive the snapshot engine over every share once.
pub fn run_backup<S: SnapshotStore>(engine: &Engine<'_, S>, shares: &[Share], today: NaiveDate) {
    for share in shares {
        match engine.run_share(share, today) {
            Ok(Outcome::Done) => {
                tracing::info!(share = %share.name, "backup complete");
            }
            Ok(Outcome::Skipped(reason)) => {
                tracing::debug!(share = %share.name, ?reason, "share skipped");
            }
            Err(err) => engine.report(&share.name, &err),
        }
    }
}
