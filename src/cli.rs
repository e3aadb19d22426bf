use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::coordinator::{CollisionMonitor, ConflictDetector, MonitorSnapshot};
use crate::error::Result;
use crate::simulator::{
    run_robot, FleetReport, FleetRun, FleetScenario, RobotSummary, SimulatedRobot,
};
use crate::transport::{AmqpTransport, Transport};

#[derive(Parser)]
#[command(name = "collision-monitor")]
#[command(version = "0.1.0")]
#[command(
    about = "Fleet collision monitor: pauses and resumes robots whose next steps overlap",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config directory (default.toml, {MONITOR_ENV}.toml)
    #[arg(short, long, default_value = "config", global = true)]
    pub config: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a fleet scenario against the collision monitor
    Run {
        /// Scenario JSON (single robot or {"robots": [...]})
        #[arg(short, long, env = "ROBOT_CONFIG_FILE")]
        scenario: PathBuf,
        /// Override the simulator tick (ms)
        #[arg(long)]
        tick_ms: Option<u64>,
    },
    /// Coordinate robots reporting over the message broker until Ctrl-C
    Monitor,
    /// Drive the robots of a scenario over the message broker
    Robot {
        #[arg(short, long, env = "ROBOT_CONFIG_FILE")]
        scenario: PathBuf,
        /// Override the simulator tick (ms)
        #[arg(long)]
        tick_ms: Option<u64>,
    },
    /// Validate a scenario and print the conflicts present at start
    Validate {
        #[arg(short, long, env = "ROBOT_CONFIG_FILE")]
        scenario: PathBuf,
    },
}

/// Run a scenario file end to end, printing the final report as JSON
pub async fn run_scenario(
    config: AppConfig,
    scenario: &Path,
    shutdown_rx: broadcast::Receiver<()>,
) -> Result<FleetReport> {
    let scenario = FleetScenario::load(scenario)?;
    let report = FleetRun::new(config).run(scenario, shutdown_rx).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(report)
}

/// Standalone monitor: consume the broker's shared state queue until shutdown
pub async fn run_monitor(
    config: AppConfig,
    shutdown_rx: broadcast::Receiver<()>,
) -> Result<MonitorSnapshot> {
    let transport = Arc::new(AmqpTransport::connect(&config.transport).await?);
    let subscription = transport.subscribe(&config.transport.state_queue).await?;

    let monitor = CollisionMonitor::new(config.monitor.clone(), transport.clone());
    let snapshot = monitor.run(subscription, shutdown_rx).await;
    if let Err(e) = transport.close().await {
        warn!(error = %e, "failed to close broker connection");
    }

    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(snapshot)
}

/// Run every robot of a scenario against the broker until all finish or shutdown
pub async fn run_robots(
    config: AppConfig,
    scenario: &Path,
    shutdown_tx: &broadcast::Sender<()>,
) -> Result<Vec<RobotSummary>> {
    let fleet = FleetScenario::load(scenario)?;
    let transport = Arc::new(AmqpTransport::connect(&config.transport).await?);

    let mut robots = JoinSet::new();
    for spec in &fleet.robots {
        let robot = SimulatedRobot::from_spec(spec, config.simulator.initial_battery);
        robots.spawn(run_robot(
            robot,
            transport.clone(),
            config.transport.state_queue.clone(),
            config.simulator.clone(),
            shutdown_tx.subscribe(),
        ));
    }
    info!(robots = fleet.robots.len(), host = %config.transport.host, "robots started");

    let mut summaries = Vec::with_capacity(fleet.robots.len());
    while let Some(joined) = robots.join_next().await {
        match joined {
            Ok(Ok(summary)) => summaries.push(summary),
            Ok(Err(e)) => warn!(error = %e, "robot task failed"),
            Err(e) => error!(error = %e, "robot task panicked"),
        }
    }
    if let Err(e) = transport.close().await {
        warn!(error = %e, "failed to close broker connection");
    }

    summaries.sort_by(|a, b| a.device_id.cmp(&b.device_id));
    println!("{}", serde_json::to_string_pretty(&summaries)?);
    Ok(summaries)
}

/// Load a scenario and show which robots would conflict on their first step
pub fn validate_scenario(config: &AppConfig, scenario: &Path) -> Result<()> {
    let fleet = FleetScenario::load(scenario)?;
    let detector = ConflictDetector::new(config.monitor.footprint);
    let conflicts = fleet.initial_conflicts(&detector);

    println!(
        "\x1b[32m✓ {} robots loaded from {}\x1b[0m",
        fleet.robots.len(),
        scenario.display()
    );
    println!("  threshold: {:.2}", detector.threshold());
    if conflicts.is_empty() {
        println!("  no conflicts at start");
    } else {
        println!("  conflicts at start:");
        for pair in conflicts {
            println!("    {pair}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::parse_from([
            "collision-monitor",
            "run",
            "--scenario",
            "scenarios/crossing.json",
            "--tick-ms",
            "50",
        ]);
        assert_eq!(cli.config, "config");
        match cli.command {
            Commands::Run { scenario, tick_ms } => {
                assert_eq!(scenario, PathBuf::from("scenarios/crossing.json"));
                assert_eq!(tick_ms, Some(50));
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_parse_broker_commands() {
        let cli = Cli::parse_from(["collision-monitor", "monitor"]);
        assert!(matches!(cli.command, Commands::Monitor));

        let cli = Cli::parse_from(["collision-monitor", "robot", "-s", "herby.json"]);
        match cli.command {
            Commands::Robot { scenario, tick_ms } => {
                assert_eq!(scenario, PathBuf::from("herby.json"));
                assert_eq!(tick_ms, None);
            }
            _ => panic!("expected robot"),
        }
    }

    #[test]
    fn test_parse_validate_with_config_dir() {
        let cli = Cli::parse_from([
            "collision-monitor",
            "validate",
            "-s",
            "fleet.json",
            "--config",
            "/etc/monitor",
        ]);
        assert_eq!(cli.config, "/etc/monitor");
        assert!(matches!(cli.command, Commands::Validate { .. }));
    }
}
