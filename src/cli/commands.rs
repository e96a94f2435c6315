use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, debug};

use crate::config::{Config, ExecutorConfig};
use crate::engine::{self, RunSummary, ShellRunner, Throttle};
use crate::utils::morse::{self, TokioTimer};

#[derive(Parser)]
#[command(name = "throttle")]
#[command(about = "Run tasks with bounded concurrency")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true)]
    pub verbose: bool,

    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run shell tasks from a definition file
    Run {
        #[arg(short, long, help = "Path to task definition file")]
        tasks: PathBuf,

        #[arg(short, long, help = "Path to output results")]
        output: Option<PathBuf>,

        #[arg(short = 'n', long, help = "Maximum concurrent tasks")]
        concurrent: Option<usize>,

        #[arg(long, help = "Record failing tasks instead of stopping at the first one")]
        keep_going: bool,
    },

    /// Initialize the configuration
    Init {
        #[arg(short, long, help = "Force overwrite existing configuration")]
        force: bool,
    },

    /// Blink a message as timed on/off signals
    Morse {
        #[arg(help = "Message to transmit")]
        message: String,

        #[arg(long, default_value = "100", help = "Length of one unit in milliseconds")]
        unit_ms: u64,
    },
}

pub async fn execute_command(command: &Commands, config: &Config, config_path: Option<&Path>) -> Result<()> {
    match command {
        Commands::Run { tasks, output, concurrent, keep_going } => {
            handle_run_command(tasks, output.as_deref(), *concurrent, *keep_going, config)
                .await
                .map(|_| ())
        },
        Commands::Init { force } => {
            handle_init_command(*force, config_path)
        },
        Commands::Morse { message, unit_ms } => {
            handle_morse_command(message, *unit_ms).await
        },
    }
}

async fn handle_run_command(
    tasks_path: &Path,
    output: Option<&Path>,
    concurrent: Option<usize>,
    keep_going: bool,
    config: &Config,
) -> Result<RunSummary> {
    let tasks = engine::load_tasks(tasks_path)?;

    let mut runner = ShellRunner::from_config(config);
    if let Some(limit) = concurrent {
        // Same rules as the configured limit: 0 means one slot per CPU
        let executor = ExecutorConfig {
            max_concurrent_tasks: limit,
            ..config.executor.clone()
        };
        runner = ShellRunner::new(Throttle::from_config(&executor), config.shell.clone())
            .fail_fast(executor.fail_fast);
    }
    if keep_going {
        runner = runner.fail_fast(false);
    }

    let results = runner.execute_tasks(tasks).await?;
    let summary = RunSummary::from_results(&results);

    for result in &results {
        println!("{:<36} {:?} ({:.2?})", result.task_id, result.status, result.execution_time);
    }
    println!(
        "{} tasks: {} completed, {} failed, {} timed out",
        summary.total, summary.completed, summary.failed, summary.timed_out
    );

    if let Some(path) = output {
        engine::save_results(&results, path)?;
        info!("Results written to {}", path.display());
    }

    if !summary.is_success() {
        bail!("{} of {} tasks did not complete", summary.total - summary.completed, summary.total);
    }

    Ok(summary)
}

fn handle_init_command(force: bool, config_path: Option<&Path>) -> Result<()> {
    let path = Config::init(config_path, force)?;
    println!("Configuration initialized at {}", path.display());
    Ok(())
}

async fn handle_morse_command(message: &str, unit_ms: u64) -> Result<()> {
    let timer = TokioTimer::new(Duration::from_millis(unit_ms));
    let durations = morse::encode(message, morse::international_codes())?;
    debug!("Signal durations: {:?}", durations);

    let mut lit = false;
    let toggles = morse::transmit(&durations, &timer, || {
        lit = !lit;
        info!("{}", if lit { "on" } else { "off" });
    })
    .await;

    println!("Transmitted {:?} with {} toggles", message, toggles);
    Ok(())
}
