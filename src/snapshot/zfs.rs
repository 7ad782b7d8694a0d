//! ZFS command surface.
//!
//! The snapshot engine talks to storage through the [`SnapshotStore`]
//! trait; [`ZfsCli`] is the production implementation and shells out
//! via the [`Invoker`]. Existence checks are live queries (`zfs list`
//! exit status), never cached — snapshot existence *is* the state.

use std::path::Path;

use crate::error::Result;
use crate::invoke::Invoker;

const ZFS: &str = "/sbin/zfs";

/// Storage operations the snapshot engine depends on.
pub trait SnapshotStore {
    /// Whether a local dataset exists.
    fn dataset_exists(&self, dataset: &str) -> bool;

    /// Whether a local snapshot (`dataset@date`) exists.
    fn snapshot_exists(&self, snapshot: &str) -> bool;

    /// Whether the snapshot directory for `date` is visible under the
    /// share's mount point. ZFS can report a snapshot in `zfs list`
    /// before `.zfs/snapshot/<date>` shows up; replication waits for
    /// the directory.
    fn snapshot_visible(&self, mount: &Path, date: &str) -> bool;

    /// Create a local snapshot.
    fn create_snapshot(&self, snapshot: &str) -> Result<()>;

    /// Destroy a local snapshot recursively (dependent clones included).
    fn destroy_snapshot(&self, snapshot: &str) -> Result<()>;

    /// Whether a dataset or snapshot exists on the remote host.
    fn remote_exists(&self, host: &str, name: &str) -> bool;

    /// Create the remote replication dataset.
    fn create_remote_dataset(&self, host: &str, dataset: &str) -> Result<()>;

    /// Destroy a remote dataset or snapshot recursively.
    fn destroy_remote(&self, host: &str, name: &str) -> Result<()>;

    /// Full send of `snapshot` into `host:dest`.
    fn send_full(&self, snapshot: &str, host: &str, dest: &str) -> Result<()>;

    /// Incremental send of `from..to` into `host:dest`.
    fn send_incremental(&self, from: &str, to: &str, host: &str, dest: &str) -> Result<()>;

    /// Create a local dataset, optionally with a `refquota`.
    fn create_dataset(&self, dataset: &str, refquota: Option<&str>) -> Result<()>;

    /// Set the `refquota` property on a local dataset.
    fn set_refquota(&self, dataset: &str, quota: &str) -> Result<()>;

    /// Destroy a local dataset recursively.
    fn destroy_dataset(&self, dataset: &str) -> Result<()>;
}

/// [`SnapshotStore`] backed by the zfs and ssh binaries.
#[derive(Debug, Clone)]
pub struct ZfsCli {
    invoker: Invoker,
}

impl ZfsCli {
    #[must_use]
    pub fn new(invoker: Invoker) -> Self {
        Self { invoker }
    }
}

impl SnapshotStore for ZfsCli {
    fn dataset_exists(&self, dataset: &str) -> bool {
        self.invoker.run(ZFS, &["list", dataset]).is_ok()
    }

    fn snapshot_exists(&self, snapshot: &str) -> bool {
        self.invoker.run(ZFS, &["list", snapshot]).is_ok()
    }

    fn snapshot_visible(&self, mount: &Path, date: &str) -> bool {
        mount.join(".zfs/snapshot").join(date).exists()
    }

    fn create_snapshot(&self, snapshot: &str) -> Result<()> {
        self.invoker.run(ZFS, &["snapshot", snapshot]).map(|_| ())
    }

    fn destroy_snapshot(&self, snapshot: &str) -> Result<()> {
        self.invoker
            .run(ZFS, &["destroy", "-fr", snapshot])
            .map(|_| ())
    }

    fn remote_exists(&self, host: &str, name: &str) -> bool {
        self.invoker.run_remote(host, &["zfs", "list", name]).is_ok()
    }

    fn create_remote_dataset(&self, host: &str, dataset: &str) -> Result<()> {
        self.invoker
            .run_remote(host, &["zfs", "create", "-o", "compression=on", dataset])
            .map(|_| ())
    }

    fn destroy_remote(&self, host: &str, name: &str) -> Result<()> {
        self.invoker
            .run_remote(host, &["zfs", "destroy", "-fr", name])
            .map(|_| ())
    }

    fn send_full(&self, snapshot: &str, host: &str, dest: &str) -> Result<()> {
        self.invoker
            .run_shell(&format!("zfs send {snapshot} | ssh {host} zfs recv -F {dest}"))
            .map(|_| ())
    }

    fn send_incremental(&self, from: &str, to: &str, host: &str, dest: &str) -> Result<()> {
        self.invoker
            .run_shell(&format!(
                "zfs send -i {from} {to} | ssh {host} zfs recv -F {dest}"
            ))
            .map(|_| ())
    }

    fn create_dataset(&self, dataset: &str, refquota: Option<&str>) -> Result<()> {
        match refquota {
            Some(quota) => self
                .invoker
                .run(ZFS, &["create", "-o", &format!("refquota={quota}"), dataset])
                .map(|_| ()),
            None => self.invoker.run(ZFS, &["create", dataset]).map(|_| ()),
        }
    }

    fn set_refquota(&self, dataset: &str, quota: &str) -> Result<()> {
        self.invoker
            .run(ZFS, &["set", &format!("refquota={quota}"), dataset])
            .map(|_| ())
    }

    fn destroy_dataset(&self, dataset: &str) -> Result<()> {
        self.invoker
            .run(ZFS, &["destroy", "-r", dataset])
            .map(|_| ())
    }
}
