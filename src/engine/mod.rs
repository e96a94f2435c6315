mod executor;
mod runner;
mod task;

pub use executor::{run, Throttle};
pub use runner::ShellRunner;
pub use task::{load_tasks, save_results, RunSummary, TaskDefinition, TaskResult, TaskStatus};
