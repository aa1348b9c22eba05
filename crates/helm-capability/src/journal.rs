//! Per-operation record of registry mutations
//!
//! Steps of one operation mutate the shared registry through a
//! [`CapabilityJournal`]. If the operation rolls back, the journal reverts
//! exactly the mutations that took effect, newest first, so the registry ends
//! up as it was before the operation started.

use helm_core::{PathAddress, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::capability::{Capability, CapabilityRegistration};
use crate::registry::CapabilityRegistry;

#[derive(Debug, Clone)]
enum JournalEntry {
    Registered {
        capability: Capability,
        point: PathAddress,
    },
    Removed {
        capability: Capability,
        point: PathAddress,
    },
}

/// Mutation journal bound to one operation.
///
/// Cloneable handles are not provided; share it behind `Arc` between the
/// concurrently executing steps of the operation. Dropping an unfinished
/// journal rolls it back.
#[derive(Debug)]
pub struct CapabilityJournal {
    registry: Arc<CapabilityRegistry>,
    entries: Mutex<Vec<JournalEntry>>,
    finished: bool,
}

impl CapabilityJournal {
    /// Start journaling mutations against `registry`
    pub fn new(registry: Arc<CapabilityRegistry>) -> Self {
        Self {
            registry,
            entries: Mutex::new(Vec::new()),
            finished: false,
        }
    }

    /// Registry this journal writes to
    pub fn registry(&self) -> &Arc<CapabilityRegistry> {
        &self.registry
    }

    /// Register through the journal
    pub fn register_possible_capability(
        &self,
        capability: &Capability,
        point: &PathAddress,
    ) -> Result<bool> {
        let added = self.registry.register_possible_capability(capability, point)?;
        if added {
            self.entries.lock().push(JournalEntry::Registered {
                capability: capability.clone(),
                point: point.clone(),
            });
        }
        Ok(added)
    }

    /// Remove through the journal
    pub fn remove_possible_capability(
        &self,
        capability: &Capability,
        point: &PathAddress,
    ) -> Result<Option<CapabilityRegistration>> {
        let removal = self.registry.remove_point(capability, point)?;
        if removal.was_present {
            self.entries.lock().push(JournalEntry::Removed {
                capability: capability.clone(),
                point: point.clone(),
            });
        }
        Ok(removal.removed_entry)
    }

    /// Number of mutations that would be reverted on rollback
    pub fn pending(&self) -> usize {
        self.entries.lock().len()
    }

    /// Keep every recorded mutation
    pub fn commit(mut self) {
        let count = self.entries.get_mut().len();
        self.finished = true;
        debug!(mutations = count, "Capability journal committed");
    }

    /// Revert every recorded mutation, newest first
    pub fn rollback(mut self) {
        self.revert();
    }

    fn revert(&mut self) {
        self.finished = true;
        let entries = std::mem::take(self.entries.get_mut());
        let count = entries.len();
        for entry in entries.into_iter().rev() {
            let reverted = match &entry {
                JournalEntry::Registered { capability, point } => self
                    .registry
                    .remove_possible_capability(capability, point)
                    .map(|_| ()),
                JournalEntry::Removed { capability, point } => self
                    .registry
                    .register_possible_capability(capability, point)
                    .map(|_| ()),
            };
            if let Err(error) = reverted {
                warn!(error = %error, entry = ?entry, "Failed to revert capability mutation");
            }
        }
        debug!(mutations = count, "Capability journal rolled back");
    }
}

impl Drop for CapabilityJournal {
    fn drop(&mut self) {
        if !self.finished {
            self.revert();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(text: &str) -> PathAddress {
        text.parse().unwrap()
    }

    #[test]
    fn rollback_restores_previous_state() {
        let registry = Arc::new(CapabilityRegistry::new());
        let existing = Capability::new("org.helm.existing");
        registry
            .register_possible_capability(&existing, &addr("/a=1"))
            .unwrap();
        let before = registry.snapshot();

        let journal = CapabilityJournal::new(registry.clone());
        let added = Capability::new("org.helm.added");
        journal.register_possible_capability(&added, &addr("/b=1")).unwrap();
        journal.remove_possible_capability(&existing, &addr("/a=1")).unwrap();
        // no-op mutations are not journaled
        journal.register_possible_capability(&added, &addr("/b=1")).unwrap();
        journal.remove_possible_capability(&existing, &addr("/zzz=1")).unwrap();
        assert_eq!(journal.pending(), 2);

        journal.rollback();
        assert_eq!(registry.snapshot(), before);
    }

    #[test]
    fn commit_keeps_mutations() {
        let registry = Arc::new(CapabilityRegistry::new());
        let journal = CapabilityJournal::new(registry.clone());
        let cap = Capability::new("org.helm.kept");
        journal.register_possible_capability(&cap, &addr("/a=1")).unwrap();
        journal.commit();
        assert!(registry.has_possible_capability(&cap));
    }

    #[test]
    fn dropping_an_unfinished_journal_rolls_back() {
        let registry = Arc::new(CapabilityRegistry::new());
        let cap = Capability::new("org.helm.dropped");
        {
            let journal = CapabilityJournal::new(registry.clone());
            journal.register_possible_capability(&cap, &addr("/a=1")).unwrap();
        }
        assert!(!registry.has_possible_capability(&cap));
    }
}
