//! Dependency Ledger: who is blocking each paused agent
//!
//! An entry exists exactly while the coordinator believes the agent is paused.
//! Entries are created by the resolver and removed here, either because every
//! blocker has reported again or because a deadlock was broken.

use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Why an agent is being resumed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeReason {
    /// Last blocker reported a fresh state
    Cleared,
    /// Forced resume of the smallest mutually blocked agent not paused this cycle
    DeadlockBroken { members: Vec<String> },
    /// Last blocker arrived and left the fleet
    BlockerDeparted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resumption {
    pub device_id: String,
    pub reason: ResumeReason,
}

impl Resumption {
    fn new(device_id: impl Into<String>, reason: ResumeReason) -> Self {
        Self {
            device_id: device_id.into(),
            reason,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct DependencyLedger {
    entries: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `device_id` is paused because of `blockers`. Blockers accumulate
    /// across cycles. Returns false (and records nothing) for an empty blocker set.
    pub fn block(&mut self, device_id: &str, blockers: &BTreeSet<String>) -> bool {
        if blockers.is_empty() {
            return false;
        }
        let entry = self.entries.entry(device_id.to_string()).or_default();
        entry.extend(blockers.iter().filter(|b| b.as_str() != device_id).cloned());
        if entry.is_empty() {
            self.entries.remove(device_id);
            return false;
        }
        true
    }

    pub fn is_paused(&self, device_id: &str) -> bool {
        self.entries.contains_key(device_id)
    }

    pub fn blockers(&self, device_id: &str) -> Option<&BTreeSet<String>> {
        self.entries.get(device_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn paused_ids(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &BTreeSet<String>)> {
        self.entries.iter()
    }

    /// Clear `moved` from every entry not paused during this cycle, break
    /// suspected deadlocks, and return the agents that should be resumed.
    ///
    /// Clearing does not re-check separation: a fresh report from the blocker is
    /// taken as the signal. If the pair still overlaps, the next detection cycle
    /// pauses again.
    ///
    /// A deadlock is broken by resuming the smallest member that was not paused
    /// this cycle. Every conflict edge of such a member was covered by a pause
    /// made this cycle, so resuming it leaves no overlap uncovered. The agent
    /// whose entry is being scanned always qualifies.
    pub fn resume_pass(
        &mut self,
        moved: &str,
        paused_this_cycle: &BTreeSet<String>,
    ) -> Vec<Resumption> {
        let mut resumed = Vec::new();
        let ids: Vec<String> = self.entries.keys().cloned().collect();

        for id in ids {
            if paused_this_cycle.contains(&id) {
                continue;
            }
            // Entry may already be gone after a deadlock break earlier in this pass
            let Some(blockers) = self.entries.get_mut(&id) else {
                continue;
            };

            if blockers.remove(moved) {
                debug!(
                    device_id = %id,
                    cleared = moved,
                    remaining = blockers.len(),
                    "dependency cleared"
                );
            }

            if blockers.is_empty() {
                self.entries.remove(&id);
                resumed.push(Resumption::new(id, ResumeReason::Cleared));
                continue;
            }

            let remaining = blockers.clone();
            if !remaining.iter().all(|b| self.entries.contains_key(b)) {
                continue;
            }

            let mut members: Vec<String> = remaining.into_iter().collect();
            members.push(id.clone());
            members.sort();

            // `id` was skipped above if paused this cycle, so it always qualifies
            let victim = members
                .iter()
                .find(|m| !paused_this_cycle.contains(*m))
                .cloned()
                .unwrap_or_else(|| id.clone());

            warn!(
                members = ?members,
                resumed = %victim,
                "deadlock suspected, forcing resume"
            );
            self.entries.remove(&victim);
            resumed.push(Resumption::new(
                victim,
                ResumeReason::DeadlockBroken { members },
            ));
        }

        resumed
    }

    /// Forget an agent that left the fleet: drop its own entry and stop counting it
    /// as a blocker. Returns the agents that no longer have any blocker.
    pub fn release(&mut self, departed: &str) -> Vec<Resumption> {
        if self.entries.remove(departed).is_some() {
            info!(device_id = departed, "dropped ledger entry of departed agent");
        }

        let mut resumed = Vec::new();
        self.entries.retain(|id, blockers| {
            if blockers.remove(departed) && blockers.is_empty() {
                resumed.push(Resumption::new(id.clone(), ResumeReason::BlockerDeparted));
                return false;
            }
            true
        });
        resumed
    }
}
