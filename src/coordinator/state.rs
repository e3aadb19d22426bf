//! Monitor State: counters and a serialisable snapshot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Running counters for one monitor instance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorStats {
    pub reports_received: u64,
    pub reports_rejected: u64,
    pub arrivals: u64,
    pub pauses_issued: u64,
    pub resumes_issued: u64,
    pub deadlocks_broken: u64,
    pub send_failures: u64,
}

/// Point-in-time view of the monitor, printed by the CLI at shutdown
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSnapshot {
    pub stats: MonitorStats,
    /// Agents currently tracked, ascending
    pub tracked: Vec<String>,
    /// Paused agents and what blocks each of them
    pub paused: BTreeMap<String, Vec<String>>,
    pub open_command_channels: usize,
    pub started_at: DateTime<Utc>,
    pub taken_at: DateTime<Utc>,
}

impl MonitorSnapshot {
    pub fn paused_count(&self) -> usize {
        self.paused.len()
    }

    /// Seconds between monitor start and this snapshot
    pub fn uptime_secs(&self) -> i64 {
        self.taken_at
            .signed_duration_since(self.started_at)
            .num_seconds()
            .max(0)
    }
}
