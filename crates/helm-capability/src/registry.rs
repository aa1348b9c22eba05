//! Possible-capability registry
//!
//! ## Lock Usage
//!
//! Uses `parking_lot::RwLock`: every mutation takes the write lock, so
//! concurrent steps of one operation touching different resources serialize on
//! this registry only. Lookups share the read lock and see a consistent state.
//! The lock is never held across `.await` points.

use helm_core::{HelmError, PathAddress, Result};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace};

use crate::capability::{Capability, CapabilityRegistration};

/// Result of removing one registration point
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PointRemoval {
    pub(crate) was_present: bool,
    pub(crate) removed_entry: Option<CapabilityRegistration>,
}

/// Registry of capabilities declared by resources, keyed by canonical name.
///
/// A capability is present iff at least one registration point declares it;
/// the entry disappears exactly when its last point is removed.
#[derive(Debug, Default)]
pub struct CapabilityRegistry {
    possible: RwLock<BTreeMap<String, CapabilityRegistration>>,
}

impl CapabilityRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare that the resource at `point` provides `capability`.
    ///
    /// Idempotent: returns `true` when the point was newly added and `false`
    /// when it was already registered.
    pub fn register_possible_capability(
        &self,
        capability: &Capability,
        point: &PathAddress,
    ) -> Result<bool> {
        capability.validate()?;
        validate_point(point)?;
        let canonical = capability.canonical();

        let mut possible = self.possible.write();
        let registration = possible
            .entry(canonical.name().to_string())
            .or_insert_with(|| CapabilityRegistration::new(canonical));
        let added = registration.points_mut().insert(point.clone());
        if added {
            debug!(capability = %capability, point = %point, "Registered possible capability");
        } else {
            trace!(capability = %capability, point = %point, "Possible capability already registered");
        }
        Ok(added)
    }

    /// Withdraw `point`'s declaration of `capability`.
    ///
    /// Returns the removed registration when `point` was the last one;
    /// `None` when other points still provide it or nothing was registered.
    pub fn remove_possible_capability(
        &self,
        capability: &Capability,
        point: &PathAddress,
    ) -> Result<Option<CapabilityRegistration>> {
        Ok(self.remove_point(capability, point)?.removed_entry)
    }

    pub(crate) fn remove_point(
        &self,
        capability: &Capability,
        point: &PathAddress,
    ) -> Result<PointRemoval> {
        capability.validate()?;
        validate_point(point)?;
        let canonical = capability.canonical();

        let mut possible = self.possible.write();
        let Some(registration) = possible.get_mut(canonical.name()) else {
            trace!(capability = %capability, point = %point, "No possible capability to remove");
            return Ok(PointRemoval {
                was_present: false,
                removed_entry: None,
            });
        };

        let was_present = registration.points_mut().remove(point);
        if !was_present || !registration.points().is_empty() {
            debug!(
                capability = %capability,
                point = %point,
                remaining = registration.points().len(),
                "Possible capability still provided elsewhere"
            );
            return Ok(PointRemoval {
                was_present,
                removed_entry: None,
            });
        }

        let removed_entry = possible.remove(canonical.name()).map(|mut registration| {
            registration.points_mut().insert(point.clone());
            registration
        });
        debug!(capability = %capability, point = %point, "Removed possible capability");
        Ok(PointRemoval {
            was_present,
            removed_entry,
        })
    }

    /// Whether any point declares `capability`
    pub fn has_possible_capability(&self, capability: &Capability) -> bool {
        self.possible
            .read()
            .contains_key(capability.canonical().name())
    }

    /// Points declaring `capability`; empty when absent
    pub fn possible_registration_points(&self, capability: &Capability) -> BTreeSet<PathAddress> {
        self.possible
            .read()
            .get(capability.canonical().name())
            .map(|registration| registration.points().clone())
            .unwrap_or_default()
    }

    /// Names of every present capability, sorted
    pub fn possible_capability_names(&self) -> Vec<String> {
        self.possible.read().keys().cloned().collect()
    }

    /// Consistent copy of the whole registry
    pub fn snapshot(&self) -> BTreeMap<String, CapabilityRegistration> {
        self.possible.read().clone()
    }

    /// Number of present capabilities
    pub fn len(&self) -> usize {
        self.possible.read().len()
    }

    /// Whether no capability is present
    pub fn is_empty(&self) -> bool {
        self.possible.read().is_empty()
    }
}

fn validate_point(point: &PathAddress) -> Result<()> {
    if point.is_empty() {
        return Err(HelmError::invalid(
            "capability registration point must not be the root address",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(text: &str) -> PathAddress {
        text.parse().unwrap()
    }

    #[test]
    fn duplicate_registration_is_idempotent() {
        let registry = CapabilityRegistry::new();
        let cap = Capability::new("org.helm.c");
        assert!(registry.register_possible_capability(&cap, &addr("/a=1")).unwrap());
        assert!(!registry.register_possible_capability(&cap, &addr("/a=1")).unwrap());
        assert_eq!(registry.possible_registration_points(&cap).len(), 1);
    }

    #[test]
    fn fan_in_removal_scenario() {
        let registry = CapabilityRegistry::new();
        let cap = Capability::new("C");
        let (a, b) = (addr("/resource=A"), addr("/resource=B"));
        registry.register_possible_capability(&cap, &a).unwrap();
        registry.register_possible_capability(&cap, &b).unwrap();

        assert_eq!(registry.remove_possible_capability(&cap, &a).unwrap(), None);
        assert!(registry.has_possible_capability(&cap));
        assert_eq!(
            registry.possible_registration_points(&cap),
            BTreeSet::from([b.clone()])
        );

        let removed = registry.remove_possible_capability(&cap, &b).unwrap().unwrap();
        assert_eq!(removed.capability(), &cap);
        assert_eq!(removed.points(), &BTreeSet::from([b]));
        assert!(!registry.has_possible_capability(&cap));
        assert!(registry.is_empty());
    }

    #[test]
    fn legacy_and_modeled_registrations_interoperate() {
        let registry = CapabilityRegistry::new();
        let legacy = Capability::legacy("org.helm.socket");
        let modeled = Capability::new("org.helm.socket");
        registry.register_possible_capability(&legacy, &addr("/a=1")).unwrap();
        registry.register_possible_capability(&modeled, &addr("/a=2")).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.possible_registration_points(&legacy).len(), 2);

        registry.remove_possible_capability(&modeled, &addr("/a=1")).unwrap();
        let removed = registry
            .remove_possible_capability(&legacy, &addr("/a=2"))
            .unwrap()
            .unwrap();
        assert_eq!(removed.capability(), &modeled);
    }

    #[test]
    fn removing_unknown_points_is_not_an_error() {
        let registry = CapabilityRegistry::new();
        let cap = Capability::new("org.helm.c");
        assert_eq!(registry.remove_possible_capability(&cap, &addr("/a=1")).unwrap(), None);
        registry.register_possible_capability(&cap, &addr("/a=1")).unwrap();
        assert_eq!(registry.remove_possible_capability(&cap, &addr("/a=2")).unwrap(), None);
        assert!(registry.has_possible_capability(&cap));
    }

    #[test]
    fn invalid_capability_fails_before_mutation() {
        let registry = CapabilityRegistry::new();
        let err = registry
            .register_possible_capability(&Capability::new(" "), &addr("/a=1"))
            .unwrap_err();
        assert!(matches!(err, helm_core::HelmError::Invalid { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn empty_point_fails_before_mutation() {
        let registry = CapabilityRegistry::new();
        let cap = Capability::new("org.helm.web");
        let err = registry
            .register_possible_capability(&cap, &PathAddress::root())
            .unwrap_err();
        assert!(matches!(err, helm_core::HelmError::Invalid { .. }));
        assert!(registry.is_empty());

        registry.register_possible_capability(&cap, &addr("/a=1")).unwrap();
        let err = registry
            .remove_possible_capability(&cap, &PathAddress::root())
            .unwrap_err();
        assert!(matches!(err, helm_core::HelmError::Invalid { .. }));
        assert_eq!(registry.possible_registration_points(&cap).len(), 1);
    }
}
