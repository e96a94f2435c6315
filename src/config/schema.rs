use serde::{Serialize, Deserialize};
use tracing::Level;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub executor: ExecutorConfig,
    pub shell: ShellConfig,
    pub logging: LoggingConfig,
}

/// Concurrency settings for the executor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Maximum number of tasks in flight; 0 picks one slot per CPU
    pub max_concurrent_tasks: usize,
    /// Stop at the first failing task instead of recording it and moving on
    pub fail_fast: bool,
}

/// How shell tasks are launched
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellConfig {
    pub program: String,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: 4,
            fail_fast: true,
        }
    }
}

impl ExecutorConfig {
    /// Effective concurrency limit
    pub fn resolved_limit(&self) -> usize {
        match self.max_concurrent_tasks {
            0 => num_cpus::get(),
            n => n,
        }
    }
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            program: "sh".to_string(),
            timeout_seconds: Some(300),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Parse the configured level, falling back to INFO on unknown names
    pub fn tracing_level(&self) -> Level {
        self.level.parse().unwrap_or(Level::INFO)
    }
}
