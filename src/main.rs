//! Subfill - Automated Subtitle Translation Driver for Bazarr
//!
//! This is the main entry point for the subfill application, which polls
//! Bazarr for movies and episodes missing subtitles in the preferred
//! language and requests machine translation from English fallbacks.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use subfill::api::BazarrClient;
use subfill::cli::{Args, Commands};
use subfill::config::Config;
use subfill::retry::TokioSleeper;
use subfill::scheduler::Scheduler;
use subfill::workflow::Workflow;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Setup logging to both console and file
    setup_logging(args.verbose)?;

    // Load configuration (file, then environment overrides)
    let config = Config::load(args.config.as_deref())?;

    let sleeper = Arc::new(TokioSleeper);
    let client = Arc::new(BazarrClient::new(
        &config.server,
        &config.translate,
        sleeper.clone(),
    )?);
    let workflow = Workflow::new(client, sleeper, &config.translate);

    let run_once = matches!(args.command, Some(Commands::Run)) || config.schedule.run_now;

    if run_once {
        info!("Run-now enabled - running immediately");
        workflow.run_all().await;
        info!("Run complete. Exiting.");
        return Ok(());
    }

    let scheduler = Scheduler::new(&config.schedule.cron, workflow)?;
    info!("Watching on schedule '{}'", config.schedule.cron);
    scheduler.run_forever().await?;
    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let subfill_dir = std::env::current_dir()?.join(".subfill");
    let log_dir = subfill_dir.join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "subfill.log");
    let (non_blocking_file, _guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(_guard);

    // Determine log level
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Create console layer
    let console_layer = fmt::layer().with_target(false);

    // Create file layer
    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_ansi(false); // No ANSI colors in file

    // Setup layered subscriber
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer);

    // Initialize the subscriber
    subscriber
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("subfill.log").display()
    );

    Ok(())
}
