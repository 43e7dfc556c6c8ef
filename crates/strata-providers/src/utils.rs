//! Utility functions for provider implementations

use std::process::{Output, Stdio};
use strata_core::{Error, Result};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Check if a command is available in PATH
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

/// Run a command asynchronously, optionally feeding `stdin`
///
/// A non-zero exit status is returned in the `Output`, not as an error;
/// only a failure to spawn or wait is an error. Dropping the returned future
/// (a dispatch timeout) kills the child.
pub async fn run_command_async(
    provider: &str,
    cmd: &str,
    args: &[String],
    stdin: Option<&str>,
) -> Result<Output> {
    debug!("Running async: {} {}", cmd, args.join(" "));

    let mut command = tokio::process::Command::new(cmd);
    command
        .args(args)
        .kill_on_drop(true)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

    let mut child = command
        .spawn()
        .map_err(|e| Error::provider(provider, format!("failed to run {}: {}", cmd, e)))?;

    if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
        pipe.write_all(input.as_bytes())
            .await
            .map_err(|e| Error::provider(provider, format!("failed to write to {}: {}", cmd, e)))?;
        // closing stdin lets the child see EOF
        drop(pipe);
    }

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| Error::provider(provider, format!("failed to wait for {}: {}", cmd, e)))?;

    if !output.status.success() {
        warn!(
            "Command failed: {} {}\nStderr: {}",
            cmd,
            args.join(" "),
            String::from_utf8_lossy(&output.stderr)
        );
    }

    Ok(output)
}

/// Trimmed stderr, falling back to stdout when stderr is empty
pub fn failure_message(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    if stderr.trim().is_empty() {
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    } else {
        stderr.trim().to_string()
    }
}
