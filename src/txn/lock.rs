//! Per-artifact write serialization.
//!
//! Two requests editing *different* artifacts may run concurrently, but
//! `begin → mutate → commit | rollback` for the *same* artifact must not
//! interleave or the backup/rollback invariant breaks. Every `apply`
//! invocation is its own process, so the real exclusion is an advisory
//! file lock on a `.lock` sibling of the draft, held for the whole
//! protocol. The in-process table in front of it keeps threads of one
//! process from queueing on the flock.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use fs2::FileExt;

use crate::error::Result;

static LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();

/// Get the in-process serialization lock for an artifact, keyed by its
/// draft path.
///
/// Paths are not canonicalized; callers are expected to derive artifact
/// paths from the config so the same artifact always yields the same key.
pub fn artifact_lock(draft: &Path) -> Arc<Mutex<()>> {
    let table = LOCKS.get_or_init(|| Mutex::new(HashMap::new()));
    let mut map = table.lock().unwrap_or_else(PoisonError::into_inner);
    map.entry(draft.to_path_buf())
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone()
}

/// The lock file guarding an artifact's draft.
#[must_use]
pub fn lock_path(draft: &Path) -> PathBuf {
    let mut name = OsString::from(draft.as_os_str());
    name.push(".lock");
    PathBuf::from(name)
}

/// Take the cross-process exclusive lock for an artifact, blocking
/// until any other holder releases it.
///
/// The lock lives on `<draft>.lock` and is released when the returned
/// handle is dropped (or the process exits), so a crashed transaction
/// never wedges the artifact.
///
/// # Errors
///
/// Returns an error if the lock file cannot be created or locked.
pub fn lock_artifact(draft: &Path) -> Result<File> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_path(draft))?;
    file.lock_exclusive()?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_same_path_yields_same_lock() {
        let a = artifact_lock(Path::new("/tmp/hk-lock-test/dhcpd.conf.recv"));
        let b = artifact_lock(Path::new("/tmp/hk-lock-test/dhcpd.conf.recv"));
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_different_paths_yield_different_locks() {
        let a = artifact_lock(Path::new("/tmp/hk-lock-test/dhcpd.conf.recv"));
        let b = artifact_lock(Path::new("/tmp/hk-lock-test/squid.conf.recv"));
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_file_lock_excludes_second_holder() {
        let dir = TempDir::new().unwrap();
        let draft = dir.path().join("dhcpd.conf.recv");

        let held = lock_artifact(&draft).unwrap();

        // A second handle on the same lock file cannot take the lock
        // while the first is held. Advisory locks conflict per handle,
        // so this also covers the separate-process case.
        let contender = OpenOptions::new()
            .read(true)
            .write(true)
            .open(lock_path(&draft))
            .unwrap();
        assert!(contender.try_lock_exclusive().is_err());

        drop(held);
        assert!(contender.try_lock_exclusive().is_ok());
    }

    #[test]
    fn test_file_lock_released_on_drop() {
        let dir = TempDir::new().unwrap();
        let draft = dir.path().join("aliases.recv");

        {
            let _held = lock_artifact(&draft).unwrap();
        }

        let again = lock_artifact(&draft).unwrap();
        assert!(fs2::FileExt::unlock(&again).is_ok());
    }
}
