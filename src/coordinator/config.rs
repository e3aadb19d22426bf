//! Monitor Configuration

use serde::{Deserialize, Serialize};

/// Rectangular agent footprint, in the same planar map unit as path coordinates.
///
/// Two agents conflict when their predicted positions are closer than the
/// footprint diagonal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    pub width: f64,
    pub length: f64,
}

impl Footprint {
    pub fn new(width: f64, length: f64) -> Self {
        Self { width, length }
    }

    /// Separation threshold: `sqrt(width² + length²)`
    pub fn threshold(&self) -> f64 {
        self.width.hypot(self.length)
    }
}

impl Default for Footprint {
    fn default() -> Self {
        // 10 x 10 map units, threshold ~14.14
        Self {
            width: 10.0,
            length: 10.0,
        }
    }
}

/// Configuration for the collision monitor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Footprint used for every agent
    pub footprint: Footprint,
    /// When an agent arrives, drop its own ledger entry and stop counting it as a
    /// blocker for anyone else. Agents left with no blockers are resumed.
    pub release_on_arrival: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            footprint: Footprint::default(),
            release_on_arrival: true,
        }
    }
}
