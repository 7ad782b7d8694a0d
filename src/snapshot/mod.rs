//! Per-share snapshot backup.
//!
//! - [`dates`] - the `{current, previous, rotation}` date triple
//! - [`zfs`] - the storage command surface behind [`zfs::SnapshotStore`]
//! - [`engine`] - the per-share state machine
//! - [`provision`] - share dataset create/quota/destroy

pub mod dates;
pub mod engine;
pub mod provision;
pub mod zfs;

pub use engine::{Engine, Outcome, SkipReason};
pub use zfs::{SnapshotStore, ZfsCli};
