//! Simulated robot: follows a fixed path one waypoint per tick

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

use super::scenario::RobotSpec;
use crate::domain::{Command, StateReport, Waypoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RobotStatus {
    Active,
    Paused,
}

impl fmt::Display for RobotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RobotStatus::Active => write!(f, "active"),
            RobotStatus::Paused => write!(f, "paused"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimulatedRobot {
    device_id: String,
    pose: Waypoint,
    battery_level: i64,
    loaded: bool,
    path: Vec<Waypoint>,
    path_index: usize,
    status: RobotStatus,
    moves: u32,
    pauses_received: u32,
}

impl SimulatedRobot {
    pub fn new(
        device_id: impl Into<String>,
        pose: Waypoint,
        path: Vec<Waypoint>,
        battery_level: i64,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            pose,
            battery_level,
            loaded: false,
            path,
            path_index: 0,
            status: RobotStatus::Active,
            moves: 0,
            pauses_received: 0,
        }
    }

    pub fn from_spec(spec: &RobotSpec, battery_level: i64) -> Self {
        let mut robot = Self::new(
            spec.device_id.clone(),
            Waypoint::new(spec.x, spec.y, spec.theta),
            spec.path.clone(),
            battery_level,
        );
        robot.loaded = spec.loaded;
        robot
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn pose(&self) -> Waypoint {
        self.pose
    }

    pub fn status(&self) -> RobotStatus {
        self.status
    }

    pub fn battery_level(&self) -> i64 {
        self.battery_level
    }

    pub fn path_index(&self) -> usize {
        self.path_index
    }

    pub fn moves(&self) -> u32 {
        self.moves
    }

    pub fn pauses_received(&self) -> u32 {
        self.pauses_received
    }

    /// At most one waypoint left
    pub fn is_finished(&self) -> bool {
        self.path_index + 1 >= self.path.len()
    }

    pub fn apply_command(&mut self, command: Command) {
        match command {
            Command::Pause => {
                self.pauses_received += 1;
                self.status = RobotStatus::Paused;
                info!(device_id = %self.device_id, pose = %self.pose, "robot paused");
            }
            Command::Resume => {
                self.status = RobotStatus::Active;
                info!(device_id = %self.device_id, pose = %self.pose, "robot resumed");
            }
        }
    }

    /// Advance one waypoint if allowed. Battery drains only on real moves.
    pub fn step(&mut self) -> bool {
        if self.status == RobotStatus::Paused {
            debug!(device_id = %self.device_id, "robot is paused and cannot move");
            return false;
        }
        if self.is_finished() {
            debug!(device_id = %self.device_id, "robot is at the last node of its path");
            return false;
        }
        if self.battery_level <= 0 {
            warn!(device_id = %self.device_id, "robot has insufficient battery to move");
            return false;
        }

        self.path_index += 1;
        self.pose = self.path[self.path_index];
        self.battery_level -= 1;
        self.moves += 1;
        debug!(device_id = %self.device_id, node = %self.pose, "robot moved");
        true
    }

    /// State report with the remaining path, current pose first
    pub fn state(&self) -> StateReport {
        StateReport {
            device_id: Some(self.device_id.clone()),
            timestamp: Utc::now().timestamp_millis(),
            x: self.pose.x,
            y: self.pose.y,
            theta: self.pose.theta,
            battery_level: self.battery_level,
            loaded: self.loaded,
            path: self
                .path
                .get(self.path_index..)
                .map(<[Waypoint]>::to_vec)
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn robot() -> SimulatedRobot {
        let path = vec![
            Waypoint::new(10.0, 12.3, 1.57),
            Waypoint::new(11.0, 12.3, 1.57),
            Waypoint::new(12.0, 12.3, 1.57),
            Waypoint::new(13.0, 12.3, 1.57),
        ];
        SimulatedRobot::new("Herby", path[0], path, 100)
    }

    #[test]
    fn test_initial_state() {
        let robot = robot();
        let state = robot.state();
        assert_eq!(state.device_id.as_deref(), Some("Herby"));
        assert_eq!(state.path.len(), 4);
        assert_eq!(state.battery_level, 100);
        assert!(!state.loaded);
        assert_eq!(robot.status(), RobotStatus::Active);
    }

    #[test]
    fn test_move_advances_and_drains_battery() {
        let mut robot = robot();
        assert!(robot.step());
        assert_eq!(robot.pose(), Waypoint::new(11.0, 12.3, 1.57));
        assert_eq!(robot.battery_level(), 99);
        assert_eq!(robot.state().path.len(), 3);
    }

    #[test]
    fn test_paused_robot_does_not_move() {
        let mut robot = robot();
        robot.apply_command(Command::Pause);
        assert!(!robot.step());
        assert_eq!(robot.path_index(), 0);
        assert_eq!(robot.battery_level(), 100);

        robot.apply_command(Command::Resume);
        assert!(robot.step());
        assert_eq!(robot.pauses_received(), 1);
    }

    #[test]
    fn test_stops_at_end_of_path() {
        let mut robot = robot();
        while robot.step() {}
        assert!(robot.is_finished());
        assert_eq!(robot.moves(), 3);
        assert_eq!(robot.battery_level(), 97);
        assert_eq!(robot.state().path, vec![Waypoint::new(13.0, 12.3, 1.57)]);
    }

    #[test]
    fn test_empty_battery_blocks_movement() {
        let path = vec![Waypoint::new(0.0, 0.0, 0.0), Waypoint::new(1.0, 0.0, 0.0)];
        let mut robot = SimulatedRobot::new("flat", path[0], path, 0);
        assert!(!robot.step());
        assert_eq!(robot.battery_level(), 0);
    }
}
