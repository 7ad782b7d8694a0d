//! Command handlers.

pub mod apply;
pub mod artifact;
pub mod backup;
pub mod share;
pub mod validate;

use crate::config::Domain;
use crate::error::Result;
use crate::invoke::Invoker;

/// Run a domain's post-commit command, if it has one.
///
/// Invoked only after the transaction store has reported success; this
/// is what restarts the daemon / regenerates aliases / reconfigures the
/// proxy so the committed file is actually picked up.
pub(crate) fn run_post_commit(invoker: &Invoker, domain: &Domain) -> Result<()> {
    let Some((program, args)) = domain.post_commit.split_first() else {
        return Ok(());
    };
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    invoker.run(program, &args)?;
    tracing::info!(domain = %domain.name, "post-commit hook ran");
    Ok(())
}
