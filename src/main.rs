// Replica Sync
// Keeps a replica directory identical to a source directory, one pass per interval

// MODULES ------------------>>

mod config;
mod config_validation;

//--------------------------------------------------------<<
// IMPORTS ------------------>>

use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

// Module imports
use config::{Cli, RunConfig};
use config_validation::validate;
use replica_sync::core::scheduler::shutdown_listener;
use replica_sync::core::{AppConfig, SyncScheduler};
use replica_sync::logging::init_logging;
use replica_sync::SyncEngine;

//--------------------------------------------------------<<

// ┌──────────────────────────────────────────────────────────────────────────────────────────────────────────────────┐
// │                                                 MAIN ENTRY POINT                                                 │
// └──────────────────────────────────────────────────────────────────────────────────────────────────────────────────┘

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            // Logging may not be installed yet
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = RunConfig::resolve(cli, AppConfig::default())?;
    validate(&config).context("Invalid configuration")?;
    init_logging(&config.logging, Some(&config.log_file))?;

    info!(
        source = %config.source.display(),
        replica = %config.replica.display(),
        log_file = %config.log_file.display(),
        interval_secs = config.interval.as_secs(),
        dry_run = config.sync.dry_run,
        "replica-sync starting"
    );

    // Ctrl-C handler must be registered before the first pass starts
    let shutdown = shutdown_listener(shutdown_signal());
    tokio::task::yield_now().await;

    let engine = Arc::new(SyncEngine::new(config.sync.clone()));
    let scheduler = SyncScheduler::new(engine, config.source, config.replica, config.interval);

    // SINGLE PASS ---------------------------------------------------->>

    if config.once {
        return Ok(match scheduler.run_pass().await {
            Some(_) => ExitCode::SUCCESS,
            None => ExitCode::FAILURE,
        });
    }

    //--------------------------------------------------------<<
    // PERIODIC LOOP -------------------------------------------------->>

    let passes = scheduler.run_until(shutdown).await;
    info!(passes, "replica-sync stopped");

    //--------------------------------------------------------<<

    Ok(ExitCode::SUCCESS)
}

/// Resolves on Ctrl-C. If the handler cannot be installed, never resolves.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Interrupt received, shutting down"),
        Err(e) => {
            error!(error = %e, "Failed to listen for interrupt");
            std::future::pending::<()>().await
        }
    }
}
