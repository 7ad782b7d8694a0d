//! Share provisioning.
//!
//! Creating, resizing, and destroying the datasets behind managed
//! shares. Runs over the same [`SnapshotStore`] surface as the backup
//! engine; directory-backed shares (no ZFS) just get a world-writable
//! directory.

use std::fs;
use std::os::unix::fs::PermissionsExt;

use crate::config::Share;
use crate::error::Result;

use super::zfs::SnapshotStore;

/// Create the backing storage for a share and open up its mount point.
///
/// ZFS-backed shares become a dataset (with `refquota` when given);
/// plain shares become a directory. Either way the mount point ends up
/// mode 777 so the file service can hand out access itself.
///
/// # Errors
///
/// Returns an error if the dataset/directory cannot be created or the
/// permissions cannot be set.
pub fn create_share<S: SnapshotStore>(
    store: &S,
    share: &Share,
    quota: Option<&str>,
    zfs_backed: bool,
) -> Result<()> {
    if zfs_backed {
        store.create_dataset(&share.dataset, quota)?;
    } else {
        fs::create_dir_all(&share.path)?;
    }

    let mut perms = fs::metadata(&share.path)?.permissions();
    perms.set_mode(0o777);
    fs::set_permissions(&share.path, perms)?;
    Ok(())
}

/// Change the `refquota` of a ZFS-backed share.
///
/// # Errors
///
/// Returns the storage error on failure.
pub fn set_quota<S: SnapshotStore>(store: &S, share: &Share, quota: &str) -> Result<()> {
    store.set_refquota(&share.dataset, quota)
}

/// Destroy a share's dataset and its remote replica.
///
/// Missing datasets (local or remote) are a no-op, so destroying an
/// already-gone share is safe to retry.
///
/// # Errors
///
/// Returns the first storage error.
pub fn destroy_share<S: SnapshotStore>(store: &S, share: &Share) -> Result<()> {
    if store.dataset_exists(&share.dataset) {
        store.destroy_dataset(&share.dataset)?;
    }
    if share.remote_enabled {
        let remote = share.remote_dataset();
        if store.remote_exists(&share.remote_host, &remote) {
            store.destroy_remote(&share.remote_host, &remote)?;
        }
    }
    Ok(())
}
