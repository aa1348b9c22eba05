//! Property tests for the possible-capability registry
//!
//! Checks the presence invariant against a simple set model:
//! - a capability is present iff its registration-point set is non-empty
//! - registering the same (capability, point) twice leaves the set unchanged
//! - removal returns the registration exactly when the last point goes away

use helm_capability::{Capability, CapabilityJournal, CapabilityRegistry};
use helm_core::PathAddress;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Step {
    Register { cap: u8, point: u8, legacy: bool },
    Remove { cap: u8, point: u8, legacy: bool },
}

fn capability(index: u8, legacy: bool) -> Capability {
    let name = format!("org.helm.cap{index}");
    if legacy {
        Capability::legacy(name)
    } else {
        Capability::new(name)
    }
}

fn point(index: u8) -> PathAddress {
    PathAddress::from_pairs([("resource", format!("r{index}"))]).unwrap()
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        (0u8..4, 0u8..4, any::<bool>())
            .prop_map(|(cap, point, legacy)| Step::Register { cap, point, legacy }),
        (0u8..4, 0u8..4, any::<bool>())
            .prop_map(|(cap, point, legacy)| Step::Remove { cap, point, legacy }),
    ]
}

proptest! {
    /// Property: the registry agrees with a plain set model after every step
    #[test]
    fn presence_matches_set_model(steps in prop::collection::vec(step_strategy(), 0..64)) {
        let registry = CapabilityRegistry::new();
        let mut model: BTreeMap<u8, BTreeSet<u8>> = BTreeMap::new();

        for step in steps {
            match step {
                Step::Register { cap, point: p, legacy } => {
                    let before = model.get(&cap).map_or(0, BTreeSet::len);
                    let added = registry
                        .register_possible_capability(&capability(cap, legacy), &point(p))
                        .unwrap();
                    let inserted = model.entry(cap).or_default().insert(p);
                    prop_assert_eq!(added, inserted);
                    let after = model.get(&cap).map_or(0, BTreeSet::len);
                    prop_assert_eq!(after, if inserted { before + 1 } else { before });
                }
                Step::Remove { cap, point: p, legacy } => {
                    let removed = registry
                        .remove_possible_capability(&capability(cap, legacy), &point(p))
                        .unwrap();
                    let became_empty = match model.get_mut(&cap) {
                        Some(points) => points.remove(&p) && points.is_empty(),
                        None => false,
                    };
                    if became_empty {
                        model.remove(&cap);
                    }
                    prop_assert_eq!(removed.is_some(), became_empty);
                    if let Some(registration) = removed {
                        prop_assert_eq!(registration.capability(), &capability(cap, false));
                    }
                }
            }

            for cap in 0u8..4 {
                let expected: BTreeSet<PathAddress> = model
                    .get(&cap)
                    .map(|points| points.iter().copied().map(point).collect())
                    .unwrap_or_default();
                let present = registry.has_possible_capability(&capability(cap, false));
                prop_assert_eq!(present, !expected.is_empty());
                prop_assert_eq!(
                    registry.possible_registration_points(&capability(cap, true)),
                    expected
                );
            }
        }
    }

    /// Property: rolling back a journal restores the registry exactly
    #[test]
    fn journal_rollback_is_exact(
        setup in prop::collection::vec(step_strategy(), 0..16),
        during in prop::collection::vec(step_strategy(), 0..32),
    ) {
        let registry = Arc::new(CapabilityRegistry::new());
        for step in setup {
            apply(&registry, None, step);
        }
        let before = registry.snapshot();

        let journal = CapabilityJournal::new(registry.clone());
        for step in during {
            apply(&registry, Some(&journal), step);
        }
        journal.rollback();

        prop_assert_eq!(registry.snapshot(), before);
    }
}

fn apply(registry: &CapabilityRegistry, journal: Option<&CapabilityJournal>, step: Step) {
    match (step, journal) {
        (Step::Register { cap, point: p, legacy }, Some(journal)) => {
            journal
                .register_possible_capability(&capability(cap, legacy), &point(p))
                .unwrap();
        }
        (Step::Register { cap, point: p, legacy }, None) => {
            registry
                .register_possible_capability(&capability(cap, legacy), &point(p))
                .unwrap();
        }
        (Step::Remove { cap, point: p, legacy }, Some(journal)) => {
            journal
                .remove_possible_capability(&capability(cap, legacy), &point(p))
                .unwrap();
        }
        (Step::Remove { cap, point: p, legacy }, None) => {
            registry
                .remove_possible_capability(&capability(cap, legacy), &point(p))
                .unwrap();
        }
    }
}

#[test]
fn test_concurrent_steps_serialize_on_the_registry() {
    let registry = Arc::new(CapabilityRegistry::new());
    let cap = Capability::new("org.helm.shared");

    let handles: Vec<_> = (0u8..8)
        .map(|i| {
            let registry = registry.clone();
            let cap = cap.clone();
            std::thread::spawn(move || {
                for _ in 0..100 {
                    registry.register_possible_capability(&cap, &point(i)).unwrap();
                    registry.remove_possible_capability(&cap, &point(i)).unwrap();
                }
                registry.register_possible_capability(&cap, &point(i)).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(registry.possible_registration_points(&cap).len(), 8);
}
