//! `hostkeeper artifact` - rename/remove artifact files.
//!
//! Used by the mail domain when a per-user forward file changes name or
//! goes away; the post-commit hook (`newaliases` there) runs afterwards
//! so the service catches up.

use crate::cli::ArtifactCommand;
use crate::config::AgentConfig;
use crate::error::Result;
use crate::invoke::Invoker;
use crate::txn;

/// Dispatch an artifact file-management command.
///
/// # Errors
///
/// Returns an error for an unknown domain or a failed rename/removal.
pub fn execute(config: &AgentConfig, command: &ArtifactCommand) -> Result<()> {
    let invoker = Invoker::new(config.backup_policy().command_timeout_secs);
    match command {
        ArtifactCommand::Rename { domain, from, to } => {
            let domain = config.domain(domain)?;
            txn::rename(&domain.temp_dir, &domain.live_dir, from, to)?;
            tracing::info!(domain = %domain.name, from, to, "artifact renamed");
            super::run_post_commit(&invoker, domain)
        }
        ArtifactCommand::Remove { domain, name } => {
            let domain = config.domain(domain)?;
            txn::remove(&domain.temp_dir, &domain.live_dir, name)?;
            tracing::info!(domain = %domain.name, name, "artifact removed");
            super::run_post_commit(&invoker, domain)
        }
    }
}
