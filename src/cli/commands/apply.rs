//! `hostkeeper apply` - run one config transaction.

use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::Path;

use crate::cli::OpKind;
use crate::config::AgentConfig;
use crate::error::Result;
use crate::invoke::Invoker;
use crate::txn::{self, Artifact, EditOp};

/// Apply an edit to `<domain>/<artifact>` and commit it into the live
/// config, then run the domain's post-commit hook.
///
/// # Errors
///
/// Returns an error for an unknown domain, an unreadable payload, or
/// any transaction/hook failure. On a transaction failure the draft has
/// already been rolled back.
pub fn execute(
    config: &AgentConfig,
    domain_name: &str,
    artifact_name: &str,
    op: OpKind,
    payload_file: Option<&Path>,
) -> Result<()> {
    let domain = config.domain(domain_name)?;
    let payload = read_payload(payload_file)?;
    let op = parse_op(op, &payload)?;

    let artifact = Artifact::new(&domain.temp_dir, &domain.live_dir, artifact_name);
    txn::execute(&artifact, &op)?;
    tracing::info!(
        domain = %domain.name,
        artifact = artifact_name,
        "config committed"
    );

    let invoker = Invoker::new(config.backup_policy().command_timeout_secs);
    super::run_post_commit(&invoker, domain)
}

fn read_payload(payload_file: Option<&Path>) -> Result<String> {
    match payload_file {
        Some(path) => Ok(fs::read_to_string(path)?),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

/// Build the tagged edit operation from the CLI kind and raw payload.
fn parse_op(kind: OpKind, payload: &str) -> Result<EditOp> {
    Ok(match kind {
        OpKind::Overwrite => EditOp::Overwrite(payload.to_string()),
        OpKind::Append => EditOp::Append(payload.to_string()),
        OpKind::Update => {
            let edits: BTreeMap<String, String> = serde_json::from_str(payload)?;
            EditOp::ReplaceOrDelete(edits)
        }
        OpKind::Delete => {
            let keys: Vec<String> = serde_json::from_str(payload)?;
            EditOp::DeleteKeys(keys)
        }
    })
}
