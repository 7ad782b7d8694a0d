//! `hostkeeper validate` - check the settings file.

use std::path::Path;

use crate::config::AgentConfig;
use crate::error::Result;

/// Print a short summary of an already-loaded (and therefore valid)
/// settings file.
///
/// # Errors
///
/// Infallible after config load; fallible for command symmetry.
pub fn execute(config: &AgentConfig, path: &Path) -> Result<()> {
    println!(
        "{}: ok ({} domain(s), {} share(s))",
        path.display(),
        config.domains.len(),
        config.shares.len()
    );
    for share in &config.shares {
        let remote = if share.remote_enabled {
            format!("-> {}:{}", share.remote_host, share.remote_dataset())
        } else {
            "local only".to_string()
        };
        println!(
            "  share {} [{}] keep {} {:?}(s), {remote}",
            share.name, share.dataset, share.retention_count, share.retention_unit
        );
    }
    Ok(())
}
