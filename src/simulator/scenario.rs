//! Fleet scenario files
//!
//! Accepts either a single robot object (`{"device_id": ..., "path": [...]}`)
//! or a fleet (`{"robots": [...]}`).

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use crate::coordinator::{AgentRegistry, ConflictDetector, ConflictPair};
use crate::domain::{StateReport, Waypoint};
use crate::error::{MonitorError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotSpec {
    pub device_id: String,
    pub x: f64,
    pub y: f64,
    pub theta: f64,
    pub path: Vec<Waypoint>,
    #[serde(default)]
    pub loaded: bool,
}

impl RobotSpec {
    pub fn validate(&self) -> Result<()> {
        if self.device_id.trim().is_empty() {
            return Err(MonitorError::Validation("robot device_id is empty".into()));
        }
        if self.path.is_empty() {
            return Err(MonitorError::Validation(format!(
                "robot {} has an empty path",
                self.device_id
            )));
        }
        Ok(())
    }

    /// Report the robot would send before its first move
    pub fn initial_report(&self) -> StateReport {
        StateReport {
            x: self.x,
            y: self.y,
            theta: self.theta,
            loaded: self.loaded,
            ..StateReport::with_path(self.device_id.clone(), self.path.clone())
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ScenarioFile {
    Fleet { robots: Vec<RobotSpec> },
    Single(RobotSpec),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetScenario {
    pub robots: Vec<RobotSpec>,
}

impl FleetScenario {
    pub fn new(robots: Vec<RobotSpec>) -> Self {
        Self { robots }
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let scenario = match serde_json::from_str::<ScenarioFile>(raw)? {
            ScenarioFile::Fleet { robots } => Self { robots },
            ScenarioFile::Single(robot) => Self {
                robots: vec![robot],
            },
        };
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        Self::from_json(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.robots.is_empty() {
            return Err(MonitorError::Validation("scenario has no robots".into()));
        }
        let mut seen = HashSet::new();
        for robot in &self.robots {
            robot.validate()?;
            if !seen.insert(robot.device_id.as_str()) {
                return Err(MonitorError::Validation(format!(
                    "duplicate device_id {}",
                    robot.device_id
                )));
            }
        }
        Ok(())
    }

    /// Conflicts the monitor would see if every robot reported its starting state
    pub fn initial_conflicts(&self, detector: &ConflictDetector) -> BTreeSet<ConflictPair> {
        let mut registry = AgentRegistry::new();
        for robot in &self.robots {
            registry.update(robot.initial_report());
        }
        detector.detect_all(&registry)
    }
}
