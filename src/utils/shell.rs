// src/utils/shell.rs
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, trace, warn};

use crate::config::ShellConfig;
use crate::error::{AppError, AppResult};

/// Execute a command through the configured shell
pub async fn execute_command(shell: &ShellConfig, cmd: &str) -> AppResult<Output> {
    debug!("Executing command: {}", cmd);

    let output = Command::new(&shell.program)
        .arg("-c")
        .arg(cmd)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| AppError::ExternalToolError {
            tool: shell.program.clone(),
            message: format!("Failed to execute command {}: {}", cmd, e),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!("Command failed: {}\nStderr: {}", cmd, stderr);
    } else {
        trace!("Command succeeded: {}", cmd);
    }

    Ok(output)
}

/// Execute a command, giving up after `timeout_secs` (if any)
pub async fn execute_command_with_timeout(
    shell: &ShellConfig,
    cmd: &str,
    timeout_secs: Option<u64>,
) -> AppResult<Output> {
    let Some(timeout_secs) = timeout_secs else {
        return execute_command(shell, cmd).await;
    };

    debug!("Executing command with timeout {}: {}", timeout_secs, cmd);

    match tokio::time::timeout(Duration::from_secs(timeout_secs), execute_command(shell, cmd)).await {
        Ok(result) => result,
        Err(_) => {
            warn!("Command timed out after {} seconds: {}", timeout_secs, cmd);
            Err(AppError::TimeoutError {
                operation: cmd.to_string(),
                seconds: timeout_secs,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_captures_stdout() {
        let output = execute_command(&ShellConfig::default(), "printf hello").await.unwrap();

        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout), "hello");
    }

    #[tokio::test]
    async fn test_times_out() {
        let err = execute_command_with_timeout(&ShellConfig::default(), "sleep 5", Some(1))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::TimeoutError { seconds: 1, .. }));
    }

    #[tokio::test]
    async fn test_missing_shell_is_reported() {
        let shell = ShellConfig {
            program: "/nonexistent/shell".to_string(),
            timeout_seconds: None,
        };

        let err = execute_command(&shell, "true").await.unwrap_err();
        assert!(matches!(err, AppError::ExternalToolError { .. }));
    }
}
