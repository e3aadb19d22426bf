pub mod cli;
pub mod config;
pub mod coordinator;
pub mod domain;
pub mod error;
pub mod simulator;
pub mod transport;

pub use config::AppConfig;
pub use coordinator::{CollisionMonitor, MonitorConfig, MonitorSnapshot};
pub use domain::{AgentState, Command, StateReport, Waypoint};
pub use error::{MonitorError, Result};
pub use simulator::{FleetRun, FleetScenario};
pub use transport::{AmqpTransport, LocalBus, Transport};
