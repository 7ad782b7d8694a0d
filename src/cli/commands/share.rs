//! `hostkeeper share` - provision share datasets.

use crate::cli::ShareCommand;
use crate::config::AgentConfig;
use crate::error::Result;
use crate::invoke::Invoker;
use crate::snapshot::{provision, ZfsCli};

/// Dispatch a share provisioning command.
///
/// # Errors
///
/// Returns an error for an unknown share or a failed storage command.
pub fn execute(config: &AgentConfig, command: &ShareCommand) -> Result<()> {
    let store = ZfsCli::new(Invoker::new(config.backup_policy().command_timeout_secs));
    match command {
        ShareCommand::Create {
            name,
            quota,
            directory,
        } => {
            let share = config.share(name)?;
            provision::create_share(&store, share, quota.as_deref(), !directory)?;
            tracing::info!(share = %share.name, "share created");
            Ok(())
        }
        ShareCommand::Quota { name, quota } => {
            let share = config.share(name)?;
            provision::set_quota(&store, share, quota)?;
            tracing::info!(share = %share.name, quota, "refquota updated");
            Ok(())
        }
        ShareCommand::Destroy { name } => {
            let share = config.share(name)?;
            provision::destroy_share(&store, share)?;
            tracing::info!(share = %share.name, "share destroyed");
            Ok(())
        }
    }
}
