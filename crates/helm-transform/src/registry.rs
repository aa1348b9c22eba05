//! Registered transformation descriptions, by address pattern and version
//!
//! ## Lock Usage
//!
//! Uses `parking_lot::RwLock`. Registrations happen while subsystems start;
//! lookups from concurrent transformations share the read lock.

use helm_core::{ModelVersion, PathAddress};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::description::ResourceTransformationDescription;

#[derive(Debug)]
struct PatternEntry {
    pattern: PathAddress,
    versions: BTreeMap<ModelVersion, Arc<ResourceTransformationDescription>>,
}

/// Descriptions keyed by address pattern, then by model version.
///
/// A description registered under version `v` applies to targets at `v`
/// and, when no closer version is registered, to older targets as well.
/// Targets newer than every registered version need no transformation.
#[derive(Debug, Default)]
pub struct TransformerRegistry {
    entries: RwLock<Vec<PatternEntry>>,
}

impl TransformerRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `description` for resources matching `pattern` up to `version`.
    ///
    /// Replaces any description already registered for the same pair.
    pub fn register(
        &self,
        pattern: PathAddress,
        version: ModelVersion,
        description: ResourceTransformationDescription,
    ) {
        debug!(pattern = %pattern, version = %version, "Registered transformation description");
        let description = Arc::new(description);
        let mut entries = self.entries.write();
        match entries.iter_mut().find(|entry| entry.pattern == pattern) {
            Some(entry) => {
                entry.versions.insert(version, description);
            }
            None => entries.push(PatternEntry {
                pattern,
                versions: BTreeMap::from([(version, description)]),
            }),
        }
    }

    /// Description for `address` at target `version`.
    ///
    /// Patterns are tried in registration order; within the first matching
    /// pattern the exact version wins, else the nearest higher one.
    pub fn resolve(
        &self,
        address: &PathAddress,
        version: ModelVersion,
    ) -> Option<Arc<ResourceTransformationDescription>> {
        let entries = self.entries.read();
        let entry = entries
            .iter()
            .find(|entry| entry.pattern.matches(address))?;
        entry
            .versions
            .range(version..)
            .next()
            .map(|(_, description)| description.clone())
    }

    /// Number of registered patterns
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::RejectAttributeChecker;

    fn addr(text: &str) -> PathAddress {
        text.parse().unwrap()
    }

    fn rejecting(attribute: &str) -> ResourceTransformationDescription {
        ResourceTransformationDescription::builder()
            .reject(attribute, RejectAttributeChecker::Defined)
            .build()
    }

    #[test]
    fn exact_then_nearest_higher_version() {
        let registry = TransformerRegistry::new();
        let pattern = addr("/subsystem=web/connector=*");
        registry.register(pattern.clone(), ModelVersion::new(1, 1, 0), rejecting("a"));
        registry.register(pattern, ModelVersion::new(1, 3, 0), rejecting("b"));

        let concrete = addr("/subsystem=web/connector=http");
        let at = |v| registry.resolve(&concrete, v).map(|d| d.checkers("a").len());

        assert_eq!(at(ModelVersion::new(1, 1, 0)), Some(1));
        assert_eq!(at(ModelVersion::new(1, 0, 0)), Some(1));
        assert_eq!(at(ModelVersion::new(1, 2, 0)), Some(0));
        assert_eq!(at(ModelVersion::new(1, 3, 0)), Some(0));
        assert_eq!(at(ModelVersion::new(1, 4, 0)), None);
    }

    #[test]
    fn unmatched_addresses_resolve_to_nothing() {
        let registry = TransformerRegistry::new();
        registry.register(addr("/subsystem=web"), ModelVersion::new(1, 0, 0), rejecting("a"));
        assert!(registry
            .resolve(&addr("/subsystem=mail"), ModelVersion::new(1, 0, 0))
            .is_none());
        assert!(registry
            .resolve(&addr("/subsystem=web/connector=http"), ModelVersion::new(1, 0, 0))
            .is_none());
    }
}
