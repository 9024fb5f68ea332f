//! Known-instance registry and active-set bookkeeping.
//!
//! Holds the set of configured remote Jira instances and which subset is
//! currently targeted by fan-out operations. The known set is replaced
//! wholesale on each refresh; the active set survives refreshes except
//! where invalidated: stale ids are pruned, and a pruned-empty set resets
//! to "all known instances".

use std::collections::BTreeSet;

use crate::types::Instance;

/// Registry of known instances plus the user-selected active subset.
#[derive(Debug, Clone, Default)]
pub struct InstanceRegistry {
    known: Vec<Instance>,
    active: BTreeSet<String>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last-fetched known set, in backend order.
    pub fn known(&self) -> &[Instance] {
        &self.known
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    /// Replaces the known set wholesale and re-establishes the invariant
    /// `active ⊆ known`; an empty intersection (including first load)
    /// resets the active set to all known instances.
    pub fn replace(&mut self, instances: Vec<Instance>) {
        self.known = instances;
        let known_ids: BTreeSet<&str> = self.known.iter().map(|site| site.id.as_str()).collect();
        self.active.retain(|id| known_ids.contains(id.as_str()));
        if self.active.is_empty() {
            self.active = known_ids.into_iter().map(str::to_string).collect();
        }
    }

    /// Flips active membership for `id`. No-op for unknown instances.
    pub fn toggle(&mut self, id: &str) {
        if !self.known.iter().any(|site| site.id == id) {
            return;
        }
        if !self.active.remove(id) {
            self.active.insert(id.to_string());
        }
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.active.contains(id)
    }

    /// Active ids in registry iteration order (known-set order, not set
    /// order). Fan-out sequencing and its log determinism depend on this.
    pub fn active_ids(&self) -> Vec<String> {
        self.known
            .iter()
            .filter(|site| self.active.contains(&site.id))
            .map(|site| site.id.clone())
            .collect()
    }

    /// Snapshot of the active instances for a fan-out run. Taken once at
    /// operation start; later toggles must not affect an in-flight run.
    pub fn active_instances(&self) -> Vec<Instance> {
        self.known
            .iter()
            .filter(|site| self.active.contains(&site.id))
            .cloned()
            .collect()
    }

    /// The raw active set, for visibility filtering.
    pub fn active_set(&self) -> &BTreeSet<String> {
        &self.active
    }

    /// Label for an id, falling back to the id itself for unknown sites.
    pub fn label(&self, id: &str) -> String {
        self.known
            .iter()
            .find(|site| site.id == id)
            .map(|site| site.label().to_string())
            .unwrap_or_else(|| id.to_string())
    }
}
