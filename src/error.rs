//! Error types for the hostkeeper agent.
//!
//! Provides structured error handling with:
//! - Category-based exit codes (2=config, 3=not_found, 4=edit, 5=command, 8=io)
//! - Combined stdout+stderr text attached to external-command failures
//! - A timeout variant so callers can classify retryable vs fatal

use thiserror::Error;

/// Result type alias for hostkeeper operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in hostkeeper operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown domain: {0}")]
    UnknownDomain(String),

    #[error("Unknown share: {0}")]
    UnknownShare(String),

    #[error("Invalid edit key '{key}': {source}")]
    Pattern {
        key: String,
        #[source]
        source: regex::Error,
    },

    /// External command exited non-zero. `output` carries the combined
    /// stdout+stderr text of the failed invocation.
    #[error("`{command}` failed ({status}): {output}")]
    Command {
        command: String,
        status: String,
        output: String,
    },

    #[error("`{command}` timed out after {timeout_secs}s")]
    CommandTimeout { command: String, timeout_secs: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Category-based exit code for the CLI.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::UnknownDomain(_) | Self::UnknownShare(_) => 3,
            Self::Pattern { .. } => 4,
            Self::Command { .. } | Self::CommandTimeout { .. } => 5,
            Self::Io(_) | Self::Json(_) => 8,
        }
    }

    /// Whether this error is a command timeout.
    ///
    /// Timeouts on replication commands are treated as best-effort and
    /// may be retried; timeouts on local storage commands are fatal.
    /// The snapshot engine makes that call per state.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::CommandTimeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_by_category() {
        assert_eq!(Error::Config("x".into()).exit_code(), 2);
        assert_eq!(Error::UnknownDomain("dhcp".into()).exit_code(), 3);
        assert_eq!(
            Error::Command {
                command: "zfs list".into(),
                status: "exit status: 1".into(),
                output: String::new(),
            }
            .exit_code(),
            5
        );
        assert_eq!(
            Error::Io(std::io::Error::other("boom")).exit_code(),
            8
        );
    }

    #[test]
    fn test_command_error_carries_output() {
        let err = Error::Command {
            command: "zfs snapshot tank/docs@2026-08-29".into(),
            status: "exit status: 1".into(),
            output: "cannot create snapshot: dataset busy".into(),
        };
        let text = err.to_string();
        assert!(text.contains("zfs snapshot tank/docs@2026-08-29"));
        assert!(text.contains("dataset busy"));
    }

    #[test]
    fn test_timeout_classification() {
        let err = Error::CommandTimeout {
            command: "ssh backup1 zfs recv".into(),
            timeout_secs: 30,
        };
        assert!(err.is_timeout());
        assert!(!Error::Config("x".into()).is_timeout());
    }
}
