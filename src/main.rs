use clap::Parser;
use collision_monitor::cli::{self, Cli, Commands};
use collision_monitor::config::AppConfig;
use collision_monitor::error::{MonitorError, Result};
use tokio::sync::broadcast;
use tracing::{info, warn};

mod main_runtime;

use main_runtime::{init_logging, shutdown_signal};

/// Broadcast sender that fires once on Ctrl-C or SIGTERM
fn spawn_shutdown_listener() -> broadcast::Sender<()> {
    let (shutdown_tx, _) = broadcast::channel(1);
    let tx = shutdown_tx.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Received shutdown signal");
        let _ = tx.send(());
    });
    shutdown_tx
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_from(&cli.config).unwrap_or_else(|e| {
        eprintln!(
            "Warning: failed to load config from {} ({e}), using defaults",
            cli.config
        );
        AppConfig::default_config()
    });

    if let Commands::Run {
        tick_ms: Some(tick_ms),
        ..
    }
    | Commands::Robot {
        tick_ms: Some(tick_ms),
        ..
    } = &cli.command
    {
        config.simulator.tick_ms = *tick_ms;
    }

    init_logging(&config.logging);
    if let Err(problems) = config.validate() {
        return Err(MonitorError::Validation(problems.join("; ")));
    }

    match cli.command {
        Commands::Run { scenario, .. } => {
            info!(
                queue = %config.transport.state_queue,
                tick_ms = config.simulator.tick_ms,
                "starting in-process fleet run"
            );
            let shutdown_tx = spawn_shutdown_listener();
            let report = cli::run_scenario(config, &scenario, shutdown_tx.subscribe()).await?;
            if !report.all_arrived() {
                warn!("not every robot reached the end of its path");
            }
        }
        Commands::Monitor => {
            info!(
                host = %config.transport.host,
                queue = %config.transport.state_queue,
                "starting collision monitoring service"
            );
            let shutdown_tx = spawn_shutdown_listener();
            cli::run_monitor(config, shutdown_tx.subscribe()).await?;
        }
        Commands::Robot { scenario, .. } => {
            info!(
                host = %config.transport.host,
                queue = %config.transport.state_queue,
                tick_ms = config.simulator.tick_ms,
                "starting robot simulator"
            );
            let shutdown_tx = spawn_shutdown_listener();
            cli::run_robots(config, &scenario, &shutdown_tx).await?;
        }
        Commands::Validate { scenario } => {
            cli::validate_scenario(&config, &scenario)?;
        }
    }

    Ok(())
}
