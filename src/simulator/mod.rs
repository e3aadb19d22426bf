//! Agent simulator
//!
//! Path-following robots that report their state on the shared queue and obey
//! pause/resume commands, plus the harness that runs a fleet of them against
//! the collision monitor.

pub mod fleet;
pub mod robot;
pub mod scenario;

pub use fleet::{run_robot, FleetReport, FleetRun, RobotSummary};
pub use robot::{RobotStatus, SimulatedRobot};
pub use scenario::{FleetScenario, RobotSpec};
