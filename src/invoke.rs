//! Synchronous external command execution.
//!
//! Everything the agent does to the outside world (zfs, ssh, service
//! restarts) goes through [`Invoker`]. Commands run to completion with a
//! bounded wall-clock timeout; a failed command surfaces its combined
//! stdout+stderr text in the error so the management server sees exactly
//! what the tool printed.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// Interval between child exit polls.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Runs external commands with a fixed per-command timeout.
#[derive(Debug, Clone)]
pub struct Invoker {
    timeout: Duration,
}

impl Invoker {
    /// Create an invoker with a per-command timeout in seconds.
    #[must_use]
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Run a local command to completion.
    ///
    /// Returns the combined stdout+stderr text on success (exit code 0).
    ///
    /// # Errors
    ///
    /// - [`Error::Command`] with the combined output on non-zero exit
    /// - [`Error::CommandTimeout`] if the deadline passes (the child is
    ///   killed)
    /// - [`Error::Io`] if the command cannot be spawned
    pub fn run(&self, program: &str, args: &[&str]) -> Result<String> {
        let displayed = display_command(program, args);
        tracing::debug!(command = %displayed, "running command");

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        self.wait_with_combined_output(child, &displayed)
    }

    /// Run a command on a remote host over ssh.
    ///
    /// # Errors
    ///
    /// Same contract as [`Invoker::run`].
    pub fn run_remote(&self, host: &str, args: &[&str]) -> Result<String> {
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push(host);
        full.extend_from_slice(args);
        self.run("ssh", &full)
    }

    /// Run a shell pipeline via `bash -c`.
    ///
    /// Used for `zfs send | ssh … zfs recv`, which needs a pipe the
    /// invoker cannot express as a single argv.
    ///
    /// # Errors
    ///
    /// Same contract as [`Invoker::run`].
    pub fn run_shell(&self, script: &str) -> Result<String> {
        self.run("bash", &["-c", script])
    }

    /// Poll the child until it exits or the deadline passes.
    fn wait_with_combined_output(&self, mut child: Child, display: &str) -> Result<String> {
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let out_reader = thread::spawn(move || read_all(stdout));
        let err_reader = thread::spawn(move || read_all(stderr));

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                // Kill and reap so the child does not linger; the pipe
                // readers unblock once the process is gone.
                let _ = child.kill();
                let _ = child.wait();
                let _ = out_reader.join();
                let _ = err_reader.join();
                return Err(Error::CommandTimeout {
                    command: display.to_string(),
                    timeout_secs: self.timeout.as_secs(),
                });
            }
            thread::sleep(POLL_INTERVAL);
        };

        let mut combined = out_reader.join().unwrap_or_default();
        combined.push_str(&err_reader.join().unwrap_or_default());

        if status.success() {
            Ok(combined)
        } else {
            Err(Error::Command {
                command: display.to_string(),
                status: status.to_string(),
                output: combined,
            })
        }
    }
}

fn read_all(pipe: Option<impl Read>) -> String {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn display_command(program: &str, args: &[&str]) -> String {
    let mut out = program.to_string();
    for arg in args {
        out.push(' ');
        out.push_str(arg);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoker() -> Invoker {
        Invoker::new(10)
    }

    #[test]
    fn test_run_captures_stdout() {
        let out = invoker().run("echo", &["hello"]).unwrap();
        assert_eq!(out, "hello\n");
    }

    #[test]
    fn test_run_failure_carries_combined_output() {
        let err = invoker()
            .run_shell("echo out; echo err >&2; exit 3")
            .unwrap_err();
        match err {
            Error::Command {
                command,
                status,
                output,
            } => {
                assert!(command.starts_with("bash -c"));
                assert!(status.contains('3'));
                assert!(output.contains("out"));
                assert!(output.contains("err"));
            }
            other => panic!("expected command error, got {other}"),
        }
    }

    #[test]
    fn test_run_missing_program_is_io_error() {
        let err = invoker().run("/nonexistent/hk-no-such-binary", &[]).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_timeout_kills_child() {
        let started = Instant::now();
        let err = Invoker::new(1).run("sleep", &["30"]).unwrap_err();
        assert!(err.is_timeout());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_display_command() {
        assert_eq!(
            display_command("zfs", &["list", "tank/docs"]),
            "zfs list tank/docs"
        );
    }
}
