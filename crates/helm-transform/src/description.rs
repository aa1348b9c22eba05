//! Per-resource transformation descriptions
//!
//! A description lists, for one resource type and one target version range,
//! which attributes are discarded, which are rejected by which checkers and
//! which are renamed. Application order is fixed: discard, reject, rename.

use helm_core::{ModelNode, PathAddress};
use indexmap::IndexMap;

use crate::accumulator::RejectionAccumulator;
use crate::checker::RejectAttributeChecker;
use crate::context::TransformationContext;

/// When an attribute is silently dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardPolicy {
    /// Dropped whatever its value
    Always,
    /// Dropped only while undefined; defined values go on to the checkers
    Undefined,
}

impl DiscardPolicy {
    /// Whether `value` is discarded under this policy
    pub fn discards(self, value: &ModelNode) -> bool {
        match self {
            Self::Always => true,
            Self::Undefined => !value.is_defined(),
        }
    }
}

/// Transformation rules for one resource type
#[derive(Debug, Clone, Default)]
pub struct ResourceTransformationDescription {
    discards: IndexMap<String, DiscardPolicy>,
    checkers: IndexMap<String, Vec<RejectAttributeChecker>>,
    renames: IndexMap<String, String>,
}

impl ResourceTransformationDescription {
    /// Start building a description
    pub fn builder() -> ResourceTransformationDescriptionBuilder {
        ResourceTransformationDescriptionBuilder::default()
    }

    /// Whether the description changes nothing
    pub fn is_empty(&self) -> bool {
        self.discards.is_empty() && self.checkers.is_empty() && self.renames.is_empty()
    }

    /// Discard policy for `attribute`, if any
    pub fn discard_policy(&self, attribute: &str) -> Option<DiscardPolicy> {
        self.discards.get(attribute).copied()
    }

    /// Whether `attribute` = `value` is dropped
    pub fn discards(&self, attribute: &str, value: &ModelNode) -> bool {
        self.discard_policy(attribute)
            .is_some_and(|policy| policy.discards(value))
    }

    /// Checkers registered for `attribute`
    pub fn checkers(&self, attribute: &str) -> &[RejectAttributeChecker] {
        self.checkers.get(attribute).map_or(&[], Vec::as_slice)
    }

    /// Name `attribute` is sent under
    pub fn renamed<'a>(&'a self, attribute: &'a str) -> &'a str {
        self.renames.get(attribute).map_or(attribute, String::as_str)
    }

    /// Run the checkers for one defined attribute value
    pub fn check_attribute(
        &self,
        address: &PathAddress,
        attribute: &str,
        value: &ModelNode,
        context: &TransformationContext,
        rejections: &mut RejectionAccumulator,
    ) {
        if !value.is_defined() {
            return;
        }
        for checker in self.checkers(attribute) {
            if checker.rejects(address, attribute, value, context) {
                rejections.record(checker, attribute, value);
            }
        }
    }

    /// Apply discard, reject and rename to an attribute map.
    ///
    /// `node` is modified in place; returns whether anything changed.
    /// Rejections are recorded, never applied.
    pub fn apply_to_attributes(
        &self,
        address: &PathAddress,
        node: &mut ModelNode,
        context: &TransformationContext,
        rejections: &mut RejectionAccumulator,
    ) -> bool {
        let mut changed = false;

        let discarded: Vec<String> = node
            .entries()
            .filter(|(name, value)| self.discards(name, value))
            .map(|(name, _)| name.to_string())
            .collect();
        for name in discarded {
            node.remove(&name);
            changed = true;
        }

        for (name, value) in node.entries() {
            self.check_attribute(address, name, value, context, rejections);
        }

        for (from, to) in &self.renames {
            changed |= node.rename_key(from, to);
        }
        changed
    }
}

/// Builder for [`ResourceTransformationDescription`]
#[derive(Debug, Default)]
pub struct ResourceTransformationDescriptionBuilder {
    description: ResourceTransformationDescription,
}

impl ResourceTransformationDescriptionBuilder {
    /// Discard `attribute` under `policy`
    pub fn discard(mut self, attribute: impl Into<String>, policy: DiscardPolicy) -> Self {
        self.description.discards.insert(attribute.into(), policy);
        self
    }

    /// Add `checker` for `attribute`; checkers run in insertion order
    pub fn reject(mut self, attribute: impl Into<String>, checker: RejectAttributeChecker) -> Self {
        self.description
            .checkers
            .entry(attribute.into())
            .or_default()
            .push(checker);
        self
    }

    /// Send `from` under the name `to`
    pub fn rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.description.renames.insert(from.into(), to.into());
        self
    }

    /// Finish
    pub fn build(self) -> ResourceTransformationDescription {
        self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TransformationTarget;
    use helm_core::ModelVersion;

    #[test]
    fn discard_then_reject_then_rename() {
        let description = ResourceTransformationDescription::builder()
            .discard("gone", DiscardPolicy::Always)
            .discard("maybe", DiscardPolicy::Undefined)
            .reject("maybe", RejectAttributeChecker::Defined)
            .reject("gone", RejectAttributeChecker::Defined)
            .rename("old-name", "legacy-name")
            .build();
        let context = TransformationContext::for_target(TransformationTarget::new(
            "s1",
            ModelVersion::new(1, 2, 0),
        ));

        let mut node = ModelNode::object()
            .with("old-name", 1)
            .with("gone", "x")
            .with("maybe", ModelNode::Undefined)
            .with("kept", true);
        let mut rejections = RejectionAccumulator::new();
        assert!(description.apply_to_attributes(
            &PathAddress::root(),
            &mut node,
            &context,
            &mut rejections
        ));
        assert!(rejections.is_empty());
        let keys: Vec<&str> = node.keys().collect();
        assert_eq!(keys, ["legacy-name", "kept"]);

        let mut defined = ModelNode::object().with("maybe", 5);
        description.apply_to_attributes(&PathAddress::root(), &mut defined, &context, &mut rejections);
        assert_eq!(rejections.len(), 1);
        assert!(defined.has_defined("maybe"));
    }
}
