//! Conflict Detector: pairs of agents whose next steps overlap

use std::collections::BTreeSet;
use std::fmt;

use super::config::Footprint;
use super::registry::AgentRegistry;
use crate::domain::AgentState;

/// Unordered pair of conflicting agents, stored with the smaller id first
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConflictPair {
    first: String,
    second: String,
}

impl ConflictPair {
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        let (a, b) = (a.into(), b.into());
        if a <= b {
            Self { first: a, second: b }
        } else {
            Self { first: b, second: a }
        }
    }

    pub fn first(&self) -> &str {
        &self.first
    }

    pub fn second(&self) -> &str {
        &self.second
    }

    pub fn contains(&self, device_id: &str) -> bool {
        self.first == device_id || self.second == device_id
    }
}

impl fmt::Display for ConflictPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<->{}", self.first, self.second)
    }
}

#[derive(Debug, Clone)]
pub struct ConflictDetector {
    threshold: f64,
}

impl ConflictDetector {
    pub fn new(footprint: Footprint) -> Self {
        Self {
            threshold: footprint.threshold(),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Strictly closer than the threshold; touching at exactly the threshold is fine.
    pub fn conflicts(&self, a: &AgentState, b: &AgentState) -> bool {
        a.next_waypoint().distance_to(&b.next_waypoint()) < self.threshold
    }

    /// Check every unordered pair of tracked agents
    pub fn detect_all(&self, registry: &AgentRegistry) -> BTreeSet<ConflictPair> {
        let agents: Vec<&AgentState> = registry.agents().collect();
        let mut pairs = BTreeSet::new();

        for (i, a) in agents.iter().enumerate() {
            for b in &agents[i + 1..] {
                if self.conflicts(a, b) {
                    pairs.insert(ConflictPair::new(a.device_id.as_str(), b.device_id.as_str()));
                }
            }
        }

        pairs
    }
}

impl Default for ConflictDetector {
    fn default() -> Self {
        Self::new(Footprint::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{StateReport, Waypoint};

    fn state(id: &str, points: &[(f64, f64)]) -> AgentState {
        AgentState::try_from(StateReport::with_path(
            id,
            points.iter().map(|&(x, y)| Waypoint::new(x, y, 0.0)).collect(),
        ))
        .unwrap()
    }

    #[test]
    fn test_pair_is_unordered() {
        assert_eq!(ConflictPair::new("b", "a"), ConflictPair::new("a", "b"));
        assert_eq!(ConflictPair::new("b", "a").first(), "a");
    }

    #[test]
    fn test_threshold_boundary_is_strict() {
        // threshold 5.0
        let detector = ConflictDetector::new(Footprint::new(3.0, 4.0));
        let a = state("a", &[(0.0, 0.0), (0.0, 0.0)]);
        let at_threshold = state("b", &[(9.0, 9.0), (3.0, 4.0)]);
        let inside = state("c", &[(9.0, 9.0), (3.0, 3.9)]);

        assert!(!detector.conflicts(&a, &at_threshold));
        assert!(detector.conflicts(&a, &inside));
    }

    #[test]
    fn test_uses_next_waypoint_not_current() {
        let detector = ConflictDetector::new(Footprint::new(3.0, 4.0));
        // Current poses are on top of each other, next steps are far apart.
        let a = state("a", &[(0.0, 0.0), (-50.0, 0.0)]);
        let b = state("b", &[(0.0, 0.0), (50.0, 0.0)]);
        assert!(!detector.conflicts(&a, &b));
    }

    #[test]
    fn test_single_waypoint_predicts_current_pose() {
        let detector = ConflictDetector::new(Footprint::new(3.0, 4.0));
        let parked = state("a", &[(10.0, 10.0)]);
        let approaching = state("b", &[(0.0, 0.0), (11.0, 10.0)]);
        assert!(detector.conflicts(&parked, &approaching));
    }

    #[test]
    fn test_detect_all_pairs() {
        let mut registry = AgentRegistry::new();
        let nexts = [
            ("robot1", (8.0, 8.0)),
            ("robot2", (15.0, 15.0)),
            ("robot3", (1.0, 1.0)),
        ];
        for (id, next) in nexts {
            registry.update(StateReport::with_path(
                id,
                vec![Waypoint::new(0.0, 0.0, 0.0), Waypoint::new(next.0, next.1, 0.0)],
            ));
        }

        let pairs = ConflictDetector::default().detect_all(&registry);
        let expected: BTreeSet<_> = [
            ConflictPair::new("robot1", "robot2"),
            ConflictPair::new("robot1", "robot3"),
        ]
        .into_iter()
        .collect();
        assert_eq!(pairs, expected);
    }

    #[test]
    fn test_detect_all_empty_registry() {
        assert!(ConflictDetector::default()
            .detect_all(&AgentRegistry::new())
            .is_empty());
    }
}
