// src/core/runner.rs

use std::fmt;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::core::models::ProbeOutcome;

/// Reason reported when a tool exceeds its wall-clock budget.
pub const TIMEOUT_REASON: &str = "timeout";

/// A fully expanded external command: program plus argv, no shell involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Runs `command` to completion or until `timeout` elapses.
///
/// The child is spawned with `kill_on_drop`, so when the timeout fires and the
/// wait future is dropped the process is killed and reaped by tokio; nothing
/// outlives the call. Output on stderr alone is not a failure, and a non-zero
/// exit that still produced stdout is reported as a success.
pub async fn run(command: &ToolCommand, timeout: Duration) -> ProbeOutcome {
    info!(command = %command, timeout_secs = timeout.as_secs(), "Starting external tool.");
    let started = Instant::now();

    let child = Command::new(&command.program)
        .args(&command.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn();

    let child = match child {
        Ok(c) => c,
        Err(e) => {
            warn!(program = %command.program, error = %e, "Failed to spawn external tool.");
            return ProbeOutcome::Failure(format!("failed to start {}: {}", command.program, e));
        }
    };

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            warn!(program = %command.program, error = %e, "Failed to collect tool output.");
            return ProbeOutcome::Failure(format!("failed to read output of {}: {}", command.program, e));
        }
        Err(_) => {
            warn!(program = %command.program, elapsed = ?started.elapsed(), "External tool timed out, killed.");
            return ProbeOutcome::Failure(TIMEOUT_REASON.to_string());
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr);
    debug!(
        program = %command.program,
        status = %output.status,
        stdout_bytes = stdout.len(),
        stderr_bytes = stderr.len(),
        "External tool exited."
    );

    if !output.status.success() && stdout.trim().is_empty() {
        let reason = match stderr.trim() {
            "" => format!("{} exited with {}", command.program, output.status),
            msg => msg.to_string(),
        };
        warn!(program = %command.program, %reason, "External tool failed.");
        return ProbeOutcome::Failure(reason);
    }

    info!(program = %command.program, elapsed = ?started.elapsed(), "External tool finished.");
    ProbeOutcome::Success(stdout)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> ToolCommand {
        ToolCommand::new("sh", ["-c", script])
    }

    #[tokio::test]
    async fn captures_stdout() {
        let outcome = run(&sh("echo '22/tcp open ssh'"), Duration::from_secs(5)).await;
        assert_eq!(outcome, ProbeOutcome::Success("22/tcp open ssh\n".to_string()));
    }

    #[tokio::test]
    async fn stderr_alone_is_not_failure() {
        let outcome = run(&sh("echo progress >&2; echo done"), Duration::from_secs(5)).await;
        assert_eq!(outcome, ProbeOutcome::Success("done\n".to_string()));
    }

    #[tokio::test]
    async fn nonzero_exit_with_stdout_is_success() {
        let outcome = run(&sh("echo partial; exit 3"), Duration::from_secs(5)).await;
        assert_eq!(outcome, ProbeOutcome::Success("partial\n".to_string()));
    }

    #[tokio::test]
    async fn nonzero_exit_without_stdout_reports_stderr() {
        let outcome = run(&sh("echo 'host unreachable' >&2; exit 1"), Duration::from_secs(5)).await;
        assert_eq!(outcome, ProbeOutcome::Failure("host unreachable".to_string()));
    }

    #[tokio::test]
    async fn nonzero_exit_without_output_reports_status() {
        let outcome = run(&sh("exit 2"), Duration::from_secs(5)).await;
        match outcome {
            ProbeOutcome::Failure(reason) => assert!(reason.starts_with("sh exited with")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn timeout_kills_the_tool() {
        let started = Instant::now();
        let outcome = run(&sh("sleep 30"), Duration::from_millis(200)).await;
        assert_eq!(outcome, ProbeOutcome::Failure(TIMEOUT_REASON.to_string()));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn missing_program_is_failure() {
        let command = ToolCommand::new("/nonexistent/vanguard-tool", Vec::<String>::new());
        let outcome = run(&command, Duration::from_secs(1)).await;
        assert!(!outcome.is_success());
    }
}
