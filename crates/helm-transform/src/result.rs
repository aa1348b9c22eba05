//! Adaptation of participant replies
//!
//! Every transformed operation carries a result transformer that turns the
//! participant's raw reply into what the original request expects.

use helm_core::outcome::{self, ErrorCode, RESULT};
use helm_core::ModelNode;
use std::fmt;
use tracing::trace;

/// Key of the per-attribute map in a resource description
pub const ATTRIBUTES: &str = "attributes";

/// Turns a raw participant reply into the caller's expected shape
pub trait OperationResultTransformer: fmt::Debug + Send + Sync {
    /// Adapt `raw`
    fn transform_result(&self, raw: ModelNode) -> ModelNode;
}

/// Passes replies through unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityResultTransformer;

impl OperationResultTransformer for IdentityResultTransformer {
    fn transform_result(&self, raw: ModelNode) -> ModelNode {
        raw
    }
}

/// Reply for an operation that was discarded instead of sent
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardedResultTransformer;

impl OperationResultTransformer for DiscardedResultTransformer {
    fn transform_result(&self, _raw: ModelNode) -> ModelNode {
        outcome::success(ModelNode::Undefined)
    }
}

/// Reduces a `read-resource-description` reply to one attribute's
/// description, as `read-attribute-description` would have returned.
#[derive(Debug, Clone)]
pub struct AttributeDescriptionTransformer {
    attribute: String,
}

impl AttributeDescriptionTransformer {
    /// Transformer extracting `attribute`
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
        }
    }

    /// Attribute being extracted
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    fn unknown_attribute(&self) -> ModelNode {
        outcome::failed(
            format!("unknown attribute '{}'", self.attribute),
            ErrorCode::ClientRejection,
        )
    }

    fn description_of<'a>(&self, description: &'a ModelNode) -> Option<&'a ModelNode> {
        let attribute = description.get(ATTRIBUTES).get(&self.attribute);
        attribute.is_defined().then_some(attribute)
    }
}

impl OperationResultTransformer for AttributeDescriptionTransformer {
    fn transform_result(&self, mut raw: ModelNode) -> ModelNode {
        if !outcome::is_success(&raw) {
            return raw;
        }

        let reduced = match raw.get(RESULT) {
            // wildcard read: one entry per matching resource
            ModelNode::List(entries) => {
                let kept: Vec<ModelNode> = entries
                    .iter()
                    .filter_map(|entry| {
                        let attribute = self.description_of(entry.get(RESULT))?;
                        let mut entry = entry.clone();
                        entry.set(RESULT, attribute.clone());
                        Some(entry)
                    })
                    .collect();
                trace!(
                    attribute = %self.attribute,
                    total = entries.len(),
                    kept = kept.len(),
                    "Reduced multi-resource description"
                );
                (!kept.is_empty()).then(|| ModelNode::List(kept))
            }
            single => self.description_of(single).cloned(),
        };

        match reduced {
            Some(description) => {
                raw.set(RESULT, description);
                raw
            }
            None => self.unknown_attribute(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_resource_reply_is_reduced() {
        let description = ModelNode::object().with("type", "INT");
        let raw = outcome::success(
            ModelNode::object()
                .with("description", "a resource")
                .with(ATTRIBUTES, ModelNode::object().with("x", description.clone())),
        );
        let reduced = AttributeDescriptionTransformer::new("x").transform_result(raw);
        assert!(outcome::is_success(&reduced));
        assert_eq!(reduced.get(RESULT), &description);
    }

    #[test]
    fn failures_pass_through() {
        let raw = outcome::failed("boom", ErrorCode::OperationFailed);
        let reduced = AttributeDescriptionTransformer::new("x").transform_result(raw.clone());
        assert_eq!(reduced, raw);
    }

    #[test]
    fn discarded_operations_report_success() {
        let reply = DiscardedResultTransformer.transform_result(ModelNode::Undefined);
        assert!(outcome::is_success(&reply));
    }
}
