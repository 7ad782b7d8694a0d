//! `hostkeeper backup` - one pass over all configured shares.

use chrono::Local;

use crate::batch::run_backup;
use crate::config::AgentConfig;
use crate::error::Result;
use crate::invoke::Invoker;
use crate::report::LogReporter;
use crate::snapshot::{Engine, ZfsCli};

/// Run the snapshot engine over every configured share once.
///
/// Per-share errors are reported and swallowed; the command itself
/// fails only if it cannot get started.
///
/// # Errors
///
/// Currently infallible after config load; kept fallible for symmetry
/// with the other commands.
pub fn execute(config: &AgentConfig) -> Result<()> {
    let policy = config.backup_policy();
    let store = ZfsCli::new(Invoker::new(policy.command_timeout_secs));
    let reporter = LogReporter;
    let engine = Engine::new(&store, &reporter, policy);

    // One "now" for the whole batch; shares must not disagree about the
    // date across a midnight boundary.
    let today = Local::now().date_naive();
    tracing::info!(shares = config.shares.len(), %today, "starting backup pass");
    run_backup(&engine, &config.shares, today);
    Ok(())
}
