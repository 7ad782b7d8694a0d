//! Transactional assembly of service config files.
//!
//! Each managed config file (an *artifact*) is kept as three sibling
//! files in the domain's temp directory plus the assembled file in the
//! live directory:
//!
//! - `<name>.head` - static prefix, supplied externally, never mutated here
//! - `<name>.recv` - the draft: the variable portion, mutated per request
//! - `<name>.recv.backup` - pre-mutation copy of the draft, for rollback
//! - `<live>/<name>` - the assembled file the service actually reads
//!
//! Every state-changing request follows `begin → mutate → commit`, with
//! `rollback` on any failure after `begin`. Commit writes `head ++ draft`
//! to a temp file in the target's directory and renames it over the
//! target, so a crash mid-commit never leaves the live file half-written.
//! A failed commit still leaves `target` indeterminate from the caller's
//! point of view (the rename may or may not have landed); callers
//! re-drive a full download in that case.

pub mod lock;

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::PoisonError;

use crate::editor;
use crate::error::{Error, Result};

/// One edit operation on an artifact draft.
///
/// The operation kind is decided by the caller (CLI layer), never
/// inferred from payload shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOp {
    /// Replace the whole draft (a full re-download from the management
    /// server).
    Overwrite(String),
    /// Append raw text to the draft.
    Append(String),
    /// Replace or delete lines by key; empty replacement deletes.
    ReplaceOrDelete(BTreeMap<String, String>),
    /// Delete lines by key.
    DeleteKeys(Vec<String>),
}

/// The four paths that make up one managed config artifact.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub draft: PathBuf,
    pub backup: PathBuf,
    pub head: PathBuf,
    pub target: PathBuf,
}

impl Artifact {
    /// Derive the artifact paths for `name` from a domain's temp and
    /// live directories.
    #[must_use]
    pub fn new(temp_dir: &Path, live_dir: &Path, name: &str) -> Self {
        Self {
            draft: temp_dir.join(format!("{name}.recv")),
            backup: temp_dir.join(format!("{name}.recv.backup")),
            head: temp_dir.join(format!("{name}.head")),
            target: live_dir.join(name),
        }
    }
}

/// Create `path` as an empty file if it does not exist.
fn ensure_exists(path: &Path) -> Result<()> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;
    Ok(())
}

/// Copy the bytes of `from` into `to` and flush `to` to disk.
///
/// Both files are created if absent, so a first-ever request against an
/// artifact starts from an empty draft.
fn copy_flushed(from: &Path, to: &Path) -> Result<()> {
    ensure_exists(from)?;
    let bytes = fs::read(from)?;
    let mut file = File::create(to)?;
    file.write_all(&bytes)?;
    file.sync_all()?;
    Ok(())
}

/// Snapshot the draft into the backup file before any mutation.
///
/// # Errors
///
/// On error the caller must not proceed to mutate the draft.
pub fn begin(draft: &Path, backup: &Path) -> Result<()> {
    copy_flushed(draft, backup)
}

/// Restore the draft from the backup file.
///
/// # Errors
///
/// Returns an error if the backup cannot be read or the draft cannot be
/// rewritten.
pub fn rollback(draft: &Path, backup: &Path) -> Result<()> {
    copy_flushed(backup, draft)
}

/// Apply one edit operation to the draft file in place.
///
/// # Errors
///
/// Returns an error on I/O failure or an invalid edit key.
pub fn mutate(draft: &Path, op: &EditOp) -> Result<()> {
    match op {
        EditOp::Overwrite(text) => {
            fs::write(draft, text)?;
        }
        EditOp::Append(text) => {
            let mut file = OpenOptions::new().create(true).append(true).open(draft)?;
            file.write_all(text.as_bytes())?;
        }
        EditOp::ReplaceOrDelete(edits) => {
            let buf = fs::read_to_string(draft)?;
            fs::write(draft, editor::replace_or_delete(&buf, edits)?)?;
        }
        EditOp::DeleteKeys(keys) => {
            let buf = fs::read_to_string(draft)?;
            fs::write(draft, editor::delete_keys(&buf, keys)?)?;
        }
    }
    Ok(())
}

/// Assemble `head ++ draft` into the live target file.
///
/// The head is created empty if absent. The assembled bytes go to a
/// `.tmp` sibling of the target, are flushed, and renamed over the
/// target so the live file is replaced atomically.
///
/// # Errors
///
/// Returns an error on any I/O failure; the caller must treat the
/// target as indeterminate and roll back the draft.
pub fn commit(head: &Path, draft: &Path, target: &Path) -> Result<()> {
    ensure_exists(head)?;
    let head_bytes = fs::read(head)?;
    let draft_bytes = fs::read(draft)?;

    let file_name = target.file_name().ok_or_else(|| {
        Error::Config(format!("target path has no file name: {}", target.display()))
    })?;
    let mut tmp_name = file_name.to_os_string();
    tmp_name.push(".tmp");
    let tmp = target.with_file_name(tmp_name);

    {
        let mut file = File::create(&tmp)?;
        file.write_all(&head_bytes)?;
        file.write_all(&draft_bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, target)?;
    Ok(())
}

/// Run one full transaction against an artifact.
///
/// Serializes with any other transaction on the same artifact — in this
/// process and in any concurrently running `hostkeeper` process, via the
/// advisory lock on `<draft>.lock` — then drives `begin → mutate →
/// commit`, rolling the draft back if the mutation or commit fails. A
/// failed rollback is logged; the original error is what bubbles up.
///
/// # Errors
///
/// Returns the first error from any protocol step.
pub fn execute(artifact: &Artifact, op: &EditOp) -> Result<()> {
    let guard = lock::artifact_lock(&artifact.draft);
    let _held = guard.lock().unwrap_or_else(PoisonError::into_inner);
    let _file_lock = lock::lock_artifact(&artifact.draft)?;

    begin(&artifact.draft, &artifact.backup)?;

    let applied = mutate(&artifact.draft, op)
        .and_then(|()| commit(&artifact.head, &artifact.draft, &artifact.target));

    if let Err(err) = applied {
        if let Err(rb) = rollback(&artifact.draft, &artifact.backup) {
            tracing::error!(
                draft = %artifact.draft.display(),
                error = %rb,
                "rollback failed after transaction error"
            );
        }
        return Err(err);
    }
    Ok(())
}

/// Rename an artifact's head, draft, and live file.
///
/// Used when the management server renames a per-user config file
/// (e.g. a mail forward). The backup file is not carried over; the next
/// transaction re-creates it from the renamed draft.
///
/// # Errors
///
/// Returns an error if any of the three renames fails.
pub fn rename(temp_dir: &Path, live_dir: &Path, from: &str, to: &str) -> Result<()> {
    let old = Artifact::new(temp_dir, live_dir, from);
    let new = Artifact::new(temp_dir, live_dir, to);
    fs::rename(&old.head, &new.head)?;
    fs::rename(&old.draft, &new.draft)?;
    fs::rename(&old.target, &new.target)?;
    Ok(())
}

/// Remove an artifact's head, draft, and live file.
///
/// # Errors
///
/// Returns an error if any of the three removals fails.
pub fn remove(temp_dir: &Path, live_dir: &Path, name: &str) -> Result<()> {
    let artifact = Artifact::new(temp_dir, live_dir, name);
    fs::remove_file(&artifact.head)?;
    fs::remove_file(&artifact.draft)?;
    fs::remove_file(&artifact.target)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn artifact_in(dir: &TempDir, name: &str) -> Artifact {
        Artifact::new(dir.path(), dir.path(), name)
    }

    #[test]
    fn test_begin_creates_empty_draft_and_backup() {
        let dir = TempDir::new().unwrap();
        let a = artifact_in(&dir, "dhcpd.conf");

        begin(&a.draft, &a.backup).unwrap();

        assert_eq!(fs::read(&a.draft).unwrap(), b"");
        assert_eq!(fs::read(&a.backup).unwrap(), b"");
    }

    #[test]
    fn test_rollback_restores_bytes_at_begin() {
        let dir = TempDir::new().unwrap();
        let a = artifact_in(&dir, "dhcpd.conf");
        fs::write(&a.draft, "server A\n").unwrap();

        begin(&a.draft, &a.backup).unwrap();
        mutate(&a.draft, &EditOp::Append("server B\n".into())).unwrap();
        assert_eq!(fs::read_to_string(&a.draft).unwrap(), "server A\nserver B\n");

        rollback(&a.draft, &a.backup).unwrap();
        assert_eq!(fs::read_to_string(&a.draft).unwrap(), "server A\n");
    }

    #[test]
    fn test_commit_composition() {
        let dir = TempDir::new().unwrap();
        let a = artifact_in(&dir, "squid.conf");
        fs::write(&a.head, "head\n").unwrap();
        fs::write(&a.draft, "draft\n").unwrap();

        commit(&a.head, &a.draft, &a.target).unwrap();
        assert_eq!(fs::read_to_string(&a.target).unwrap(), "head\ndraft\n");
    }

    #[test]
    fn test_commit_with_empty_head_and_draft() {
        let dir = TempDir::new().unwrap();
        let a = artifact_in(&dir, "empty.conf");
        fs::write(&a.draft, "").unwrap();

        // Head absent: created empty, target equals the (empty) draft.
        commit(&a.head, &a.draft, &a.target).unwrap();
        assert_eq!(fs::read(&a.target).unwrap(), b"");
        assert!(a.head.exists());

        fs::write(&a.draft, "only draft\n").unwrap();
        commit(&a.head, &a.draft, &a.target).unwrap();
        assert_eq!(fs::read_to_string(&a.target).unwrap(), "only draft\n");
    }

    #[test]
    fn test_commit_truncates_prior_target() {
        let dir = TempDir::new().unwrap();
        let a = artifact_in(&dir, "aliases");
        fs::write(&a.head, "h").unwrap();
        fs::write(&a.draft, "d").unwrap();
        fs::write(&a.target, "a much longer previous live file\n").unwrap();

        commit(&a.head, &a.draft, &a.target).unwrap();
        assert_eq!(fs::read_to_string(&a.target).unwrap(), "hd");
    }

    #[test]
    fn test_execute_delete_key_scenario() {
        // head="base\n", draft="server A\n", delete "server A" → target "base\n"
        let dir = TempDir::new().unwrap();
        let a = artifact_in(&dir, "dhcpd.conf");
        fs::write(&a.head, "base\n").unwrap();
        fs::write(&a.draft, "server A\n").unwrap();

        execute(&a, &EditOp::DeleteKeys(vec!["server A".into()])).unwrap();

        assert_eq!(fs::read_to_string(&a.target).unwrap(), "base\n");
        assert_eq!(fs::read_to_string(&a.draft).unwrap(), "");
    }

    #[test]
    fn test_execute_failure_rolls_back_and_leaves_target() {
        let dir = TempDir::new().unwrap();
        let a = artifact_in(&dir, "dhcpd.conf");
        fs::write(&a.draft, "server A\n").unwrap();
        fs::write(&a.target, "pre-request live\n").unwrap();
        // Force the commit's head read to fail: head as a directory.
        fs::create_dir(&a.head).unwrap();

        let err = execute(&a, &EditOp::Append("server B\n".into())).unwrap_err();
        assert!(matches!(err, Error::Io(_)));

        // Draft restored to its begin-time bytes, target untouched.
        assert_eq!(fs::read_to_string(&a.draft).unwrap(), "server A\n");
        assert_eq!(
            fs::read_to_string(&a.target).unwrap(),
            "pre-request live\n"
        );
    }

    #[test]
    fn test_execute_invalid_key_rolls_back() {
        let dir = TempDir::new().unwrap();
        let a = artifact_in(&dir, "forward");
        fs::write(&a.draft, "user x\n").unwrap();

        let err = execute(&a, &EditOp::DeleteKeys(vec!["user (".into()])).unwrap_err();
        assert!(matches!(err, Error::Pattern { .. }));
        assert_eq!(fs::read_to_string(&a.draft).unwrap(), "user x\n");
        assert!(!a.target.exists());
    }

    #[test]
    fn test_execute_overwrite() {
        let dir = TempDir::new().unwrap();
        let a = artifact_in(&dir, "smb.conf");
        fs::write(&a.draft, "old share\n").unwrap();
        fs::write(&a.head, "[global]\n").unwrap();

        execute(&a, &EditOp::Overwrite("new share\n".into())).unwrap();
        assert_eq!(
            fs::read_to_string(&a.target).unwrap(),
            "[global]\nnew share\n"
        );
    }

    #[test]
    fn test_execute_blocks_while_artifact_lock_held() {
        // A transaction must not even `begin` while another holder (in
        // practice: another hostkeeper process) has the artifact's file
        // lock; an interleaved begin would overwrite the backup
        // mid-transaction and break rollback.
        let dir = TempDir::new().unwrap();
        let a = artifact_in(&dir, "dhcpd.conf");
        fs::write(&a.draft, "server A\n").unwrap();

        let held = lock::lock_artifact(&a.draft).unwrap();

        let artifact = a.clone();
        let worker = std::thread::spawn(move || {
            execute(&artifact, &EditOp::Append("server B\n".into()))
        });

        std::thread::sleep(std::time::Duration::from_millis(300));
        // Still parked before `begin`: no backup snapshot yet.
        assert!(!a.backup.exists());
        assert_eq!(fs::read_to_string(&a.draft).unwrap(), "server A\n");

        drop(held);
        worker.join().unwrap().unwrap();
        assert_eq!(fs::read_to_string(&a.draft).unwrap(), "server A\nserver B\n");
        assert_eq!(fs::read_to_string(&a.backup).unwrap(), "server A\n");
    }

    #[test]
    fn test_execute_releases_lock_file() {
        let dir = TempDir::new().unwrap();
        let a = artifact_in(&dir, "smb.conf");

        execute(&a, &EditOp::Append("share\n".into())).unwrap();

        // Lock file exists and is free again for the next transaction.
        assert!(lock::lock_path(&a.draft).exists());
        let relock = lock::lock_artifact(&a.draft).unwrap();
        drop(relock);
    }

    #[test]
    fn test_rename_moves_all_three_files() {
        let dir = TempDir::new().unwrap();
        let old = artifact_in(&dir, "alice");
        fs::write(&old.head, "h").unwrap();
        fs::write(&old.draft, "d").unwrap();
        fs::write(&old.target, "t").unwrap();

        rename(dir.path(), dir.path(), "alice", "bob").unwrap();

        let new = artifact_in(&dir, "bob");
        assert!(!old.head.exists() && !old.draft.exists() && !old.target.exists());
        assert_eq!(fs::read_to_string(&new.head).unwrap(), "h");
        assert_eq!(fs::read_to_string(&new.draft).unwrap(), "d");
        assert_eq!(fs::read_to_string(&new.target).unwrap(), "t");
    }

    #[test]
    fn test_remove_deletes_all_three_files() {
        let dir = TempDir::new().unwrap();
        let a = artifact_in(&dir, "carol");
        fs::write(&a.head, "h").unwrap();
        fs::write(&a.draft, "d").unwrap();
        fs::write(&a.target, "t").unwrap();

        remove(dir.path(), dir.path(), "carol").unwrap();
        assert!(!a.head.exists() && !a.draft.exists() && !a.target.exists());
    }
}
