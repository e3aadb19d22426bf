//! Collision Coordinator
//!
//! Ingests agent state reports, detects predicted overlaps between agents'
//! next steps, pauses agents to remove every overlap, tracks what each paused
//! agent waits on, and resumes agents once their blockers move or a deadlock
//! has to be broken.

pub mod config;
pub mod detector;
pub mod dispatcher;
pub mod ledger;
pub mod monitor;
pub mod registry;
pub mod resolver;
pub mod state;

pub use config::{Footprint, MonitorConfig};
pub use detector::{ConflictDetector, ConflictPair};
pub use dispatcher::CommandDispatcher;
pub use ledger::{DependencyLedger, ResumeReason, Resumption};
pub use monitor::CollisionMonitor;
pub use registry::{AgentRegistry, UpdateOutcome};
pub use resolver::{ConflictGraph, ConflictResolver, PauseDecision};
pub use state::{MonitorSnapshot, MonitorStats};
