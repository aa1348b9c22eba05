//! Rejections collected during one transformation pass.

use helm_core::ModelNode;
use indexmap::IndexMap;

use crate::checker::RejectAttributeChecker;

/// Rejected attributes sharing one checker id
#[derive(Debug, Clone)]
pub struct RejectionGroup {
    checker: RejectAttributeChecker,
    attributes: IndexMap<String, ModelNode>,
}

impl RejectionGroup {
    /// First checker recorded under this id; its message is used
    pub fn checker(&self) -> &RejectAttributeChecker {
        &self.checker
    }

    /// Rejected attribute names with their values, in rejection order
    pub fn attributes(&self) -> &IndexMap<String, ModelNode> {
        &self.attributes
    }

    /// Checker message for the rejected attributes
    pub fn message(&self) -> String {
        self.checker.message(&self.attributes)
    }
}

/// Checker id to rejected attributes, in first-rejection order.
///
/// Built per resource address and operation. The first checker seen for an
/// id is kept; later checkers with that id only add attribute/value pairs.
#[derive(Debug, Clone, Default)]
pub struct RejectionAccumulator {
    groups: IndexMap<String, RejectionGroup>,
}

impl RejectionAccumulator {
    /// Empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `checker` rejected `attribute` = `value`
    pub fn record(&mut self, checker: &RejectAttributeChecker, attribute: &str, value: &ModelNode) {
        let group = self
            .groups
            .entry(checker.id().to_string())
            .or_insert_with(|| RejectionGroup {
                checker: checker.clone(),
                attributes: IndexMap::new(),
            });
        group
            .attributes
            .entry(attribute.to_string())
            .or_insert_with(|| value.clone());
    }

    /// Fold `other` in, merging groups by checker id
    pub fn merge(&mut self, other: RejectionAccumulator) {
        for (id, group) in other.groups {
            match self.groups.get_mut(&id) {
                Some(existing) => {
                    for (attribute, value) in group.attributes {
                        existing.attributes.entry(attribute).or_insert(value);
                    }
                }
                None => {
                    self.groups.insert(id, group);
                }
            }
        }
    }

    /// Whether nothing was rejected
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of checker groups
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Groups in first-rejection order
    pub fn groups(&self) -> impl Iterator<Item = &RejectionGroup> {
        self.groups.values()
    }

    /// Earliest recorded group
    pub fn first_group(&self) -> Option<&RejectionGroup> {
        self.groups.values().next()
    }

    /// Every group's message joined for an aggregated failure
    pub fn aggregated_message(&self) -> String {
        self.groups
            .values()
            .map(RejectionGroup::message)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_checker_per_id_wins() {
        let first = RejectAttributeChecker::custom("range", "first text", |_, _, _, _| true);
        let second = RejectAttributeChecker::custom("range", "second text", |_, _, _, _| true);

        let mut accumulator = RejectionAccumulator::new();
        accumulator.record(&first, "a", &ModelNode::from(1));
        accumulator.record(&second, "b", &ModelNode::from(2));
        accumulator.record(&RejectAttributeChecker::Defined, "c", &ModelNode::from(3));

        assert_eq!(accumulator.len(), 2);
        let group = accumulator.first_group().unwrap();
        assert_eq!(group.message(), "first text: [a, b]");
        assert_eq!(
            accumulator.aggregated_message(),
            "first text: [a, b]; attributes [c] are not understood in that model version and must be undefined"
        );
    }

    #[test]
    fn merge_unions_by_id() {
        let mut left = RejectionAccumulator::new();
        left.record(&RejectAttributeChecker::Expressions, "a", &ModelNode::from("${x}"));
        let mut right = RejectionAccumulator::new();
        right.record(&RejectAttributeChecker::Expressions, "b", &ModelNode::from("${y}"));
        right.record(&RejectAttributeChecker::Defined, "c", &ModelNode::from(true));

        left.merge(right);
        assert_eq!(left.len(), 2);
        let names: Vec<&String> = left.first_group().unwrap().attributes().keys().collect();
        assert_eq!(names, ["a", "b"]);
    }
}
