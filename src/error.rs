use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single executor call.
///
/// `E` is the error type produced by the tasks themselves.
#[derive(Error, Debug)]
pub enum ThrottleError<E> {
    #[error("Task {index} failed: {error}")]
    Task {
        index: usize,
        error: E,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Task {index} panicked: {message}")]
    TaskPanicked {
        index: usize,
        message: String,
    },
}

impl<E> ThrottleError<E> {
    /// The task error, if this failure came from a task.
    pub fn into_task_error(self) -> Option<E> {
        match self {
            ThrottleError::Task { error, .. } => Some(error),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Task execution failed: {task_id} - {message}")]
    TaskExecutionError {
        task_id: String,
        message: String,
    },

    #[error("Executor error: {0}")]
    ExecutorError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("File error: {path:?} - {message}")]
    FileError {
        path: PathBuf,
        message: String,
    },

    #[error("External tool error: {tool} - {message}")]
    ExternalToolError {
        tool: String,
        message: String,
    },

    #[error("Timeout error: {operation} exceeded {seconds} seconds")]
    TimeoutError {
        operation: String,
        seconds: u64,
    },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<ThrottleError<AppError>> for AppError {
    fn from(error: ThrottleError<AppError>) -> Self {
        match error {
            ThrottleError::Task { error, .. } => error,
            ThrottleError::InvalidConfiguration(message) => AppError::ConfigError(message),
            error @ ThrottleError::TaskPanicked { .. } => AppError::ExecutorError(error.to_string()),
        }
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_failure_unwraps_to_app_error() {
        let error = ThrottleError::Task {
            index: 3,
            error: AppError::InvalidInput("bad".to_string()),
        };

        match AppError::from(error) {
            AppError::InvalidInput(message) => assert_eq!(message, "bad"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_configuration_maps_to_config_error() {
        let error: ThrottleError<AppError> = ThrottleError::InvalidConfiguration("limit".to_string());
        assert!(matches!(AppError::from(error), AppError::ConfigError(_)));
    }

    #[test]
    fn test_panic_keeps_task_index() {
        let error: ThrottleError<AppError> = ThrottleError::TaskPanicked {
            index: 2,
            message: "boom".to_string(),
        };

        match AppError::from(error) {
            AppError::ExecutorError(message) => assert_eq!(message, "Task 2 panicked: boom"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_display_includes_index() {
        let error: ThrottleError<String> = ThrottleError::Task {
            index: 7,
            error: "boom".to_string(),
        };
        assert_eq!(error.to_string(), "Task 7 failed: boom");
        assert_eq!(error.into_task_error().as_deref(), Some("boom"));
    }
}
