// src/engine/task.rs
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use tracing::{debug, info};

use crate::error::{AppResult, AppError};

/// A shell command to run through the executor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDefinition {
    #[serde(default = "generate_task_id")]
    pub id: String,
    pub command: String,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

fn generate_task_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl TaskDefinition {
    pub fn new(id: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            command: command.into(),
            timeout_seconds: None,
        }
    }
}

/// Result of task execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: String,
    pub command: String,
    pub status: TaskStatus,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub execution_time: Duration,
}

/// Status of a finished task
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TaskStatus {
    Completed,
    Failed,
    Timeout,
}

/// Counts by status over a batch of results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub timed_out: usize,
}

impl RunSummary {
    pub fn from_results(results: &[TaskResult]) -> Self {
        results.iter().fold(Self::default(), |mut summary, result| {
            summary.total += 1;
            match result.status {
                TaskStatus::Completed => summary.completed += 1,
                TaskStatus::Failed => summary.failed += 1,
                TaskStatus::Timeout => summary.timed_out += 1,
            }
            summary
        })
    }

    pub fn is_success(&self) -> bool {
        self.completed == self.total
    }
}

/// Load task definitions from a JSON file
pub fn load_tasks(path: &Path) -> AppResult<Vec<TaskDefinition>> {
    debug!("Loading tasks from {}", path.display());
    let content = std::fs::read_to_string(path)
        .map_err(|e| AppError::FileError {
            path: path.to_path_buf(),
            message: format!("Failed to read file: {}", e),
        })?;

    let tasks: Vec<TaskDefinition> = serde_json::from_str(&content)
        .map_err(|e| AppError::SerializationError(format!("Failed to parse JSON: {}", e)))?;

    validate_tasks(&tasks)?;

    info!("Loaded {} tasks from {}", tasks.len(), path.display());
    Ok(tasks)
}

fn validate_tasks(tasks: &[TaskDefinition]) -> AppResult<()> {
    let mut seen = HashSet::new();
    for task in tasks {
        if task.command.trim().is_empty() {
            return Err(AppError::InvalidInput(format!("Task {} has an empty command", task.id)));
        }
        if !seen.insert(task.id.as_str()) {
            return Err(AppError::InvalidInput(format!("Duplicate task id: {}", task.id)));
        }
    }
    Ok(())
}

/// Save results to a JSON file
pub fn save_results(results: &[TaskResult], path: &Path) -> AppResult<()> {
    debug!("Saving {} results to {}", results.len(), path.display());
    let content = serde_json::to_string_pretty(results)
        .map_err(|e| AppError::SerializationError(format!("Failed to serialize results: {}", e)))?;

    std::fs::write(path, content)
        .map_err(|e| AppError::FileError {
            path: path.to_path_buf(),
            message: format!("Failed to write file: {}", e),
        })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_tasks(json: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        std::fs::write(&path, json).unwrap();
        (dir, path)
    }

    #[test]
    fn test_load_tasks_fills_missing_ids() {
        let (_dir, path) = write_tasks(r#"[
            {"id": "build", "command": "make", "timeout_seconds": 60},
            {"command": "echo done"}
        ]"#);

        let tasks = load_tasks(&path).unwrap();

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id, "build");
        assert_eq!(tasks[0].timeout_seconds, Some(60));
        assert!(!tasks[1].id.is_empty());
        assert_eq!(tasks[1].timeout_seconds, None);
    }

    #[test]
    fn test_load_tasks_rejects_duplicates() {
        let (_dir, path) = write_tasks(r#"[
            {"id": "a", "command": "true"},
            {"id": "a", "command": "false"}
        ]"#);

        assert!(matches!(load_tasks(&path), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_load_tasks_rejects_empty_command() {
        let (_dir, path) = write_tasks(r#"[{"id": "blank", "command": "   "}]"#);
        assert!(matches!(load_tasks(&path), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_load_tasks_reports_bad_json() {
        let (_dir, path) = write_tasks("{ not json");
        assert!(matches!(load_tasks(&path), Err(AppError::SerializationError(_))));
    }

    #[test]
    fn test_summary_counts_statuses() {
        let result = |status| TaskResult {
            task_id: "t".to_string(),
            command: "true".to_string(),
            status,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            error: None,
            started_at: Utc::now(),
            execution_time: Duration::from_millis(1),
        };
        let results = vec![
            result(TaskStatus::Completed),
            result(TaskStatus::Failed),
            result(TaskStatus::Timeout),
            result(TaskStatus::Completed),
        ];

        let summary = RunSummary::from_results(&results);

        assert_eq!(summary, RunSummary { total: 4, completed: 2, failed: 1, timed_out: 1 });
        assert!(!summary.is_success());
    }
}
