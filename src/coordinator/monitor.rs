//! Collision Monitor: the coordinator's main loop
//!
//! Every state report is handled to completion before the next one is read:
//!   - registry update (or eviction on arrival)
//!   - conflict detection over all tracked pairs
//!   - greedy resolution, pause commands, ledger bookkeeping
//!   - resume/deadlock pass using the reporting agent as the cleared party
//!
//! The monitor owns all of its state exclusively, so none of it is locked.

use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::config::MonitorConfig;
use super::detector::ConflictDetector;
use super::dispatcher::CommandDispatcher;
use super::ledger::{DependencyLedger, ResumeReason, Resumption};
use super::registry::{AgentRegistry, UpdateOutcome};
use super::resolver::ConflictResolver;
use super::state::{MonitorSnapshot, MonitorStats};
use crate::domain::{Command, StateReport};
use crate::transport::{Subscription, Transport};

pub struct CollisionMonitor {
    config: MonitorConfig,
    registry: AgentRegistry,
    detector: ConflictDetector,
    ledger: DependencyLedger,
    paused_this_cycle: BTreeSet<String>,
    dispatcher: CommandDispatcher,
    stats: MonitorStats,
    started_at: chrono::DateTime<Utc>,
}

impl CollisionMonitor {
    pub fn new(config: MonitorConfig, transport: Arc<dyn Transport>) -> Self {
        info!(
            endpoint = transport.endpoint(),
            threshold = config.footprint.threshold(),
            "collision monitor created"
        );
        Self {
            detector: ConflictDetector::new(config.footprint),
            config,
            registry: AgentRegistry::new(),
            ledger: DependencyLedger::new(),
            paused_this_cycle: BTreeSet::new(),
            dispatcher: CommandDispatcher::new(transport),
            stats: MonitorStats::default(),
            started_at: Utc::now(),
        }
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &DependencyLedger {
        &self.ledger
    }

    pub fn stats(&self) -> &MonitorStats {
        &self.stats
    }

    pub fn detector(&self) -> &ConflictDetector {
        &self.detector
    }

    /// Decode raw bytes from the shared queue and handle them
    pub async fn handle_message(&mut self, payload: &[u8]) -> UpdateOutcome {
        match StateReport::from_slice(payload) {
            Ok(report) => self.handle_state_update(report).await,
            Err(e) => {
                self.stats.reports_received += 1;
                self.stats.reports_rejected += 1;
                warn!(error = %e, bytes = payload.len(), "dropping undecodable state message");
                UpdateOutcome::Rejected
            }
        }
    }

    /// Run one full detection/resolution/resume cycle for a report
    pub async fn handle_state_update(&mut self, report: StateReport) -> UpdateOutcome {
        self.stats.reports_received += 1;

        let moved = match self.registry.update(report) {
            UpdateOutcome::Tracked(id) => id,
            UpdateOutcome::Arrived(id) => {
                self.stats.arrivals += 1;
                if self.config.release_on_arrival {
                    for resumption in self.ledger.release(&id) {
                        self.resume(resumption).await;
                    }
                }
                return UpdateOutcome::Arrived(id);
            }
            UpdateOutcome::Rejected => {
                self.stats.reports_rejected += 1;
                return UpdateOutcome::Rejected;
            }
        };

        let pairs = self.detector.detect_all(&self.registry);
        if !pairs.is_empty() {
            debug!(
                reporter = %moved,
                conflicts = pairs.len(),
                tracked = self.registry.len(),
                "conflicts detected"
            );
        }

        for decision in ConflictResolver::resolve(&pairs, &mut self.ledger) {
            info!(
                device_id = %decision.device_id,
                blockers = ?decision.blockers,
                "pausing agent"
            );
            self.dispatch(&decision.device_id, Command::Pause).await;
            self.stats.pauses_issued += 1;
            self.paused_this_cycle.insert(decision.device_id);
        }

        for resumption in self.ledger.resume_pass(&moved, &self.paused_this_cycle) {
            self.resume(resumption).await;
        }
        self.paused_this_cycle.clear();

        UpdateOutcome::Tracked(moved)
    }

    async fn resume(&mut self, resumption: Resumption) {
        match &resumption.reason {
            ResumeReason::Cleared => {
                info!(device_id = %resumption.device_id, "blockers cleared, resuming agent");
            }
            ResumeReason::DeadlockBroken { members } => {
                self.stats.deadlocks_broken += 1;
                info!(
                    device_id = %resumption.device_id,
                    members = ?members,
                    "resuming agent to break deadlock"
                );
            }
            ResumeReason::BlockerDeparted => {
                info!(device_id = %resumption.device_id, "last blocker arrived, resuming agent");
            }
        }
        self.dispatch(&resumption.device_id, Command::Resume).await;
        self.stats.resumes_issued += 1;
    }

    /// Send a command; a failed publish is logged and counted, never propagated
    async fn dispatch(&mut self, device_id: &str, command: Command) {
        if let Err(e) = self.dispatcher.send(device_id, command).await {
            self.stats.send_failures += 1;
            warn!(device_id = %device_id, command = %command, error = %e, "failed to send command");
        }
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        MonitorSnapshot {
            stats: self.stats.clone(),
            tracked: self.registry.ids(),
            paused: self
                .ledger
                .entries()
                .map(|(id, blockers)| (id.clone(), blockers.iter().cloned().collect()))
                .collect(),
            open_command_channels: self.dispatcher.open_channels(),
            started_at: self.started_at,
            taken_at: Utc::now(),
        }
    }

    /// Close all cached command channels
    pub async fn close(&mut self) {
        self.dispatcher.close_all().await;
    }

    /// Main loop: consumes the shared state queue until shutdown or until the
    /// queue closes, then releases every channel and returns a final snapshot.
    pub async fn run(
        mut self,
        mut subscription: Box<dyn Subscription>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> MonitorSnapshot {
        info!(queue = subscription.queue(), "collision monitor consuming state reports");

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.recv() => {
                    info!("collision monitor: shutdown signal received");
                    break;
                }

                message = subscription.next_message() => {
                    match message {
                        Some(payload) => {
                            self.handle_message(&payload).await;
                        }
                        None => {
                            warn!(queue = subscription.queue(), "state queue closed");
                            break;
                        }
                    }
                }
            }
        }

        subscription.close().await;
        self.close().await;

        let snapshot = self.snapshot();
        info!(
            reports = snapshot.stats.reports_received,
            pauses = snapshot.stats.pauses_issued,
            resumes = snapshot.stats.resumes_issued,
            deadlocks = snapshot.stats.deadlocks_broken,
            "collision monitor: main loop exited"
        );
        snapshot
    }
}
