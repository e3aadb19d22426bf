//! Conflict Resolver: greedy max-degree elimination
//!
//! Repeatedly pauses the agent involved in the most conflicts until no conflict
//! edge is left. This approximates a minimum vertex cover; it does not promise
//! the fewest pauses.

use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use super::detector::ConflictPair;
use super::ledger::DependencyLedger;

/// Symmetric adjacency built from one cycle's conflict pairs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictGraph {
    adjacency: BTreeMap<String, BTreeSet<String>>,
}

impl ConflictGraph {
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = &'a ConflictPair>) -> Self {
        let mut adjacency: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for pair in pairs {
            adjacency
                .entry(pair.first().to_string())
                .or_default()
                .insert(pair.second().to_string());
            adjacency
                .entry(pair.second().to_string())
                .or_default()
                .insert(pair.first().to_string());
        }
        Self { adjacency }
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(BTreeSet::len).sum::<usize>() / 2
    }

    pub fn neighbours(&self, device_id: &str) -> Option<&BTreeSet<String>> {
        self.adjacency.get(device_id)
    }

    /// Highest-degree agent; ties go to the lexicographically smallest id
    pub fn max_degree_agent(&self) -> Option<&str> {
        self.adjacency
            .iter()
            .max_by(|(a_id, a), (b_id, b)| a.len().cmp(&b.len()).then_with(|| b_id.cmp(a_id)))
            .map(|(id, _)| id.as_str())
    }

    /// Remove an agent with all its edges; neighbours left without edges are dropped.
    /// Returns the agent's neighbour set at the time of removal.
    pub fn remove_agent(&mut self, device_id: &str) -> BTreeSet<String> {
        let neighbours = self.adjacency.remove(device_id).unwrap_or_default();
        for neighbour in &neighbours {
            if let Some(edges) = self.adjacency.get_mut(neighbour) {
                edges.remove(device_id);
                if edges.is_empty() {
                    self.adjacency.remove(neighbour);
                }
            }
        }
        neighbours
    }
}

/// One agent chosen to pause, with the agents it now waits on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PauseDecision {
    pub device_id: String,
    pub blockers: BTreeSet<String>,
}

pub struct ConflictResolver;

impl ConflictResolver {
    /// Choose agents to pause so every pair is covered, and record each choice in
    /// the ledger. Decisions are returned in the order they were made.
    pub fn resolve(
        pairs: &BTreeSet<ConflictPair>,
        ledger: &mut DependencyLedger,
    ) -> Vec<PauseDecision> {
        let mut graph = ConflictGraph::from_pairs(pairs);
        let mut decisions = Vec::new();

        while let Some(selected) = graph.max_degree_agent().map(str::to_string) {
            let blockers = graph.remove_agent(&selected);
            debug!(
                device_id = %selected,
                degree = blockers.len(),
                remaining_edges = graph.edge_count(),
                "selected agent to pause"
            );
            ledger.block(&selected, &blockers);
            decisions.push(PauseDecision {
                device_id: selected,
                blockers,
            });
        }

        decisions
    }
}
