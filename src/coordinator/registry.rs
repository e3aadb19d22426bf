//! Agent Registry: latest known state of every tracked agent

use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::domain::{AgentState, StateReport};

/// Result of ingesting one state report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// State stored; conflict detection should run
    Tracked(String),
    /// Path exhausted; agent evicted
    Arrived(String),
    /// Report unusable (no device_id); nothing changed
    Rejected,
}

/// Keyed by device_id; ordered so scans are deterministic
#[derive(Debug, Default)]
pub struct AgentRegistry {
    agents: BTreeMap<String, AgentState>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored state for the reporting agent, or evict it on arrival
    pub fn update(&mut self, report: StateReport) -> UpdateOutcome {
        let state = match AgentState::try_from(report) {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "dropping state report");
                return UpdateOutcome::Rejected;
            }
        };

        let device_id = state.device_id.clone();
        if state.has_arrived() {
            if self.agents.remove(&device_id).is_some() {
                info!(device_id = %device_id, "agent arrived, no longer tracked");
            } else {
                debug!(device_id = %device_id, "arrival report for untracked agent");
            }
            return UpdateOutcome::Arrived(device_id);
        }

        debug!(
            device_id = %device_id,
            remaining = state.path.len(),
            next = %state.next_waypoint(),
            "state updated"
        );
        self.agents.insert(device_id.clone(), state);
        UpdateOutcome::Tracked(device_id)
    }

    pub fn get(&self, device_id: &str) -> Option<&AgentState> {
        self.agents.get(device_id)
    }

    pub fn contains(&self, device_id: &str) -> bool {
        self.agents.contains_key(device_id)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Tracked agents in ascending id order
    pub fn agents(&self) -> impl Iterator<Item = &AgentState> {
        self.agents.values()
    }

    pub fn ids(&self) -> Vec<String> {
        self.agents.keys().cloned().collect()
    }
}
