// src/engine/runner.rs
use std::sync::Arc;
use std::time::Instant;
use chrono::Utc;
use tracing::{info, debug, error};

use crate::config::{Config, ShellConfig};
use crate::error::{AppResult, AppError};
use crate::utils::shell;
use super::executor::Throttle;
use super::task::{TaskDefinition, TaskResult, TaskStatus};

/// Runs shell task definitions through the bounded executor
pub struct ShellRunner {
    throttle: Throttle,
    shell: Arc<ShellConfig>,
    fail_fast: bool,
}

impl ShellRunner {
    pub fn new(throttle: Throttle, shell: ShellConfig) -> Self {
        Self {
            throttle,
            shell: Arc::new(shell),
            fail_fast: true,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(Throttle::from_config(&config.executor), config.shell.clone())
            .fail_fast(config.executor.fail_fast)
    }

    /// When disabled, failing commands are reported as `Failed` results
    /// instead of aborting the run.
    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn throttle(&self) -> Throttle {
        self.throttle
    }

    /// Execute a list of tasks, returning results in the order given
    pub async fn execute_tasks(&self, tasks: Vec<TaskDefinition>) -> AppResult<Vec<TaskResult>> {
        if tasks.is_empty() {
            info!("No tasks to execute");
            return Ok(Vec::new());
        }

        info!("Executing {} tasks with max concurrency {}", tasks.len(), self.throttle.limit());

        let fail_fast = self.fail_fast;
        let factories: Vec<_> = tasks
            .into_iter()
            .map(|task| {
                let shell = Arc::clone(&self.shell);
                move || async move {
                    let result = Self::execute_task(&shell, &task).await;
                    if fail_fast {
                        Self::require_success(result)
                    } else {
                        Ok(result)
                    }
                }
            })
            .collect();

        let results = self.throttle.run(factories).await.map_err(|e| {
            error!("Task run aborted: {}", e);
            AppError::from(e)
        })?;

        info!("Completed {} tasks", results.len());
        Ok(results)
    }

    /// Execute a single task, capturing any failure in the result
    async fn execute_task(shell_config: &ShellConfig, task: &TaskDefinition) -> TaskResult {
        debug!("Executing task {}", task.id);

        let started_at = Utc::now();
        let start_time = Instant::now();
        let timeout = task.timeout_seconds.or(shell_config.timeout_seconds);

        let mut result = TaskResult {
            task_id: task.id.clone(),
            command: task.command.clone(),
            status: TaskStatus::Failed,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            error: None,
            started_at,
            execution_time: std::time::Duration::from_secs(0),
        };

        match shell::execute_command_with_timeout(shell_config, &task.command, timeout).await {
            Ok(output) => {
                result.exit_code = output.status.code();
                result.stdout = String::from_utf8_lossy(&output.stdout).into_owned();
                result.stderr = String::from_utf8_lossy(&output.stderr).into_owned();
                if output.status.success() {
                    result.status = TaskStatus::Completed;
                } else {
                    result.error = Some(match output.status.code() {
                        Some(code) => format!("exited with status {}", code),
                        None => "terminated by signal".to_string(),
                    });
                }
            }
            Err(e @ AppError::TimeoutError { .. }) => {
                result.status = TaskStatus::Timeout;
                result.error = Some(e.to_string());
            }
            Err(e) => {
                result.error = Some(e.to_string());
            }
        }

        result.execution_time = start_time.elapsed();

        debug!("Task {} completed in {:?} with status {:?}", task.id, result.execution_time, result.status);

        result
    }

    fn require_success(result: TaskResult) -> AppResult<TaskResult> {
        match result.status {
            TaskStatus::Completed => Ok(result),
            TaskStatus::Timeout | TaskStatus::Failed => Err(AppError::TaskExecutionError {
                task_id: result.task_id,
                message: result.error.unwrap_or_else(|| format!("{:?}", result.status)),
            }),
        }
    }
}
