// src/main.rs
use std::process::exit;
use anyhow::Result;
use clap::Parser;
use tracing::{debug, error, info};
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, reload};

use throttle::cli::{self, Args};
use throttle::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging before the configuration is read so its warnings are
    // visible. The configured level is applied once it is known.
    let initial = if args.verbose { LevelFilter::DEBUG } else { LevelFilter::INFO };
    let (filter, filter_handle) = reload::Layer::new(initial);
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    let config = Config::load(args.config.as_deref())?;

    if args.verbose {
        info!("Verbose mode enabled");
    } else {
        let level = LevelFilter::from_level(config.logging.tracing_level());
        filter_handle.reload(level)?;
        debug!("Log level set to {}", level);
    }

    if let Err(e) = cli::execute_command(&args.command, &config, args.config.as_deref()).await {
        error!("Command execution failed: {}", e);
        exit(1);
    }

    Ok(())
}
