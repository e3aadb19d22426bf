use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{MonitorError, Result};

/// A planar pose
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Waypoint {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub theta: f64,
}

impl Waypoint {
    pub fn new(x: f64, y: f64, theta: f64) -> Self {
        Self { x, y, theta }
    }

    /// Euclidean distance in the plane (heading is ignored)
    pub fn distance_to(&self, other: &Waypoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl fmt::Display for Waypoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.theta)
    }
}

/// State report as it appears on the shared channel.
///
/// Only `device_id` and `path` carry meaning for the coordinator; every other
/// field is optional on the wire and defaults to zero/false.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub theta: f64,
    #[serde(default)]
    pub battery_level: i64,
    #[serde(default)]
    pub loaded: bool,
    #[serde(default)]
    pub path: Vec<Waypoint>,
}

impl StateReport {
    /// Minimal report carrying only an id and a remaining path
    pub fn with_path(device_id: impl Into<String>, path: Vec<Waypoint>) -> Self {
        let current = path.first().copied().unwrap_or_default();
        Self {
            device_id: Some(device_id.into()),
            x: current.x,
            y: current.y,
            theta: current.theta,
            path,
            ..Self::default()
        }
    }

    /// Decode a report from raw message bytes
    pub fn from_slice(payload: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(payload)?)
    }
}

/// Validated latest state of a tracked agent
#[derive(Debug, Clone, PartialEq)]
pub struct AgentState {
    pub device_id: String,
    pub timestamp: i64,
    pub x: f64,
    pub y: f64,
    pub theta: f64,
    pub battery_level: i64,
    pub loaded: bool,
    /// Remaining path, current pose first
    pub path: Vec<Waypoint>,
}

impl AgentState {
    /// A report with at most one waypoint left means the agent has arrived.
    /// An empty path is treated the same way.
    pub fn has_arrived(&self) -> bool {
        self.path.len() <= 1
    }

    /// Predicted position after the agent's next step: the second path entry,
    /// or the current pose when nothing else is left.
    pub fn next_waypoint(&self) -> Waypoint {
        self.path
            .get(1)
            .or_else(|| self.path.first())
            .copied()
            .unwrap_or_else(|| Waypoint::new(self.x, self.y, self.theta))
    }
}

impl TryFrom<StateReport> for AgentState {
    type Error = MonitorError;

    fn try_from(report: StateReport) -> Result<Self> {
        let device_id = report
            .device_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| MonitorError::MalformedReport("device_id not found".into()))?;

        Ok(Self {
            device_id,
            timestamp: report.timestamp,
            x: report.x,
            y: report.y,
            theta: report.theta,
            battery_level: report.battery_level,
            loaded: report.loaded,
            path: report.path,
        })
    }
}
