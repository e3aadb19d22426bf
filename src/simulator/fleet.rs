//! Fleet run: robots and the collision monitor on one in-process bus
//!
//! Each robot is its own task: it publishes its state on the shared queue
//! every tick and obeys pause/resume from `{device_id}_commands`. The monitor
//! consumes the shared queue. The run ends when every robot has reached the
//! end of its path or when a shutdown signal arrives.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::robot::SimulatedRobot;
use super::scenario::FleetScenario;
use crate::config::{AppConfig, SimulatorConfig};
use crate::coordinator::{CollisionMonitor, MonitorSnapshot};
use crate::domain::{command_queue_name, CommandMessage, Waypoint};
use crate::error::{MonitorError, Result};
use crate::transport::{LocalBus, Publisher, Transport};

/// What a robot task reports when it stops
#[derive(Debug, Clone, Serialize)]
pub struct RobotSummary {
    pub device_id: String,
    pub moves: u32,
    pub pauses_received: u32,
    pub battery_level: i64,
    pub final_pose: Waypoint,
    pub reached_goal: bool,
}

impl From<&SimulatedRobot> for RobotSummary {
    fn from(robot: &SimulatedRobot) -> Self {
        Self {
            device_id: robot.device_id().to_string(),
            moves: robot.moves(),
            pauses_received: robot.pauses_received(),
            battery_level: robot.battery_level(),
            final_pose: robot.pose(),
            reached_goal: robot.is_finished(),
        }
    }
}

/// Outcome of a complete fleet run
#[derive(Debug, Clone, Serialize)]
pub struct FleetReport {
    pub robots: Vec<RobotSummary>,
    pub monitor: MonitorSnapshot,
    pub interrupted: bool,
}

impl FleetReport {
    pub fn all_arrived(&self) -> bool {
        self.robots.iter().all(|r| r.reached_goal)
    }
}

/// Decode one command payload and apply it; bad payloads are logged and ignored
pub fn apply_command_payload(robot: &mut SimulatedRobot, payload: &[u8]) {
    match serde_json::from_slice::<CommandMessage>(payload) {
        Ok(message) => robot.apply_command(message.command),
        Err(e) => {
            warn!(
                device_id = %robot.device_id(),
                error = %e,
                payload = %String::from_utf8_lossy(payload),
                "ignoring invalid command"
            );
        }
    }
}

async fn publish_state(robot: &SimulatedRobot, publisher: &dyn Publisher) {
    match serde_json::to_vec(&robot.state()) {
        Ok(payload) => {
            if let Err(e) = publisher.publish(payload).await {
                warn!(device_id = %robot.device_id(), error = %e, "failed to publish state");
            }
        }
        Err(e) => error!(device_id = %robot.device_id(), error = %e, "failed to encode state"),
    }
}

/// Drive one robot until it reaches the end of its path or shutdown fires
pub async fn run_robot(
    mut robot: SimulatedRobot,
    transport: Arc<dyn Transport>,
    state_queue: String,
    config: SimulatorConfig,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<RobotSummary> {
    if config.startup_delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(config.startup_delay_ms)).await;
    }

    let publisher = transport.open_publisher(&state_queue).await?;
    let mut commands = transport
        .subscribe(&command_queue_name(robot.device_id()))
        .await?;

    info!(
        device_id = %robot.device_id(),
        pose = %robot.pose(),
        battery = robot.battery_level(),
        "robot started"
    );

    // Initial report so the monitor can pause before the first move
    publish_state(&robot, publisher.as_ref()).await;

    let period = Duration::from_millis(config.tick_ms.max(1));
    let mut tick = interval_at(Instant::now() + period, period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut commands_open = true;

    while !robot.is_finished() {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!(device_id = %robot.device_id(), "robot stopping on shutdown");
                break;
            }

            message = commands.next_message(), if commands_open => {
                match message {
                    Some(payload) => apply_command_payload(&mut robot, &payload),
                    None => {
                        warn!(device_id = %robot.device_id(), "command queue closed");
                        commands_open = false;
                    }
                }
            }

            _ = tick.tick() => {
                robot.step();
                publish_state(&robot, publisher.as_ref()).await;
            }
        }
    }

    if robot.is_finished() {
        info!(
            device_id = %robot.device_id(),
            moves = robot.moves(),
            battery = robot.battery_level(),
            "robot reached the end of its path"
        );
    }

    commands.close().await;
    if let Err(e) = publisher.close().await {
        debug!(device_id = %robot.device_id(), error = %e, "closing state publisher");
    }

    Ok(RobotSummary::from(&robot))
}

/// A fleet simulation wired to a fresh `LocalBus`
pub struct FleetRun {
    config: AppConfig,
    bus: LocalBus,
}

impl FleetRun {
    pub fn new(config: AppConfig) -> Self {
        let bus = LocalBus::from_config(&config.transport);
        Self { config, bus }
    }

    /// Run the scenario to completion (or until `shutdown_rx` fires)
    pub async fn run(
        self,
        scenario: FleetScenario,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<FleetReport> {
        scenario.validate()?;

        let transport: Arc<dyn Transport> = Arc::new(self.bus.clone());
        let state_queue = self.config.transport.state_queue.clone();
        let (stop_tx, _) = broadcast::channel::<()>(1);

        // Monitor subscribes before any robot can publish
        let subscription = transport.subscribe(&state_queue).await?;
        let monitor = CollisionMonitor::new(self.config.monitor.clone(), transport.clone());
        let monitor_handle = tokio::spawn(monitor.run(subscription, stop_tx.subscribe()));

        let mut robots = JoinSet::new();
        for spec in &scenario.robots {
            let robot = SimulatedRobot::from_spec(spec, self.config.simulator.initial_battery);
            robots.spawn(run_robot(
                robot,
                transport.clone(),
                state_queue.clone(),
                self.config.simulator.clone(),
                stop_tx.subscribe(),
            ));
        }
        info!(robots = scenario.robots.len(), queue = %state_queue, "fleet run started");

        let mut summaries = Vec::with_capacity(scenario.robots.len());
        let mut interrupted = false;
        let mut listening = true;
        loop {
            tokio::select! {
                signal = shutdown_rx.recv(), if listening => {
                    listening = false;
                    if signal.is_ok() {
                        info!("fleet run interrupted");
                        interrupted = true;
                        let _ = stop_tx.send(());
                    }
                }

                joined = robots.join_next() => match joined {
                    Some(Ok(Ok(summary))) => summaries.push(summary),
                    Some(Ok(Err(e))) => warn!(error = %e, "robot task failed"),
                    Some(Err(e)) => error!(error = %e, "robot task panicked"),
                    None => break,
                },
            }
        }

        // Let the monitor see the final reports before it stops
        if !interrupted {
            while self.bus.pending(&state_queue) > 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        }
        let _ = stop_tx.send(());

        let monitor = monitor_handle
            .await
            .map_err(|e| MonitorError::Internal(format!("monitor task failed: {e}")))?;

        summaries.sort_by(|a, b| a.device_id.cmp(&b.device_id));
        info!(
            robots = summaries.len(),
            arrived = summaries.iter().filter(|r| r.reached_goal).count(),
            pauses = monitor.stats.pauses_issued,
            "fleet run finished"
        );

        Ok(FleetReport {
            robots: summaries,
            monitor,
            interrupted,
        })
    }
}
