pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod utils;

// Re-export main types for easier access
pub use crate::config::Config;
pub use crate::engine::{
    run,
    Throttle,
    ShellRunner,
    TaskDefinition,
    TaskResult,
    TaskStatus
};
pub use crate::error::{AppError, AppResult, ThrottleError};
