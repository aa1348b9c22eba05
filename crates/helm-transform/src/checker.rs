//! Per-attribute rejection checkers
//!
//! A checker decides whether one attribute value can be sent to a target
//! model version. Checkers are values of one closed enum; the `Custom`
//! variant carries an id, a message and a predicate for rules that the named
//! strategies do not cover.

use helm_core::{ModelNode, PathAddress};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

use crate::context::TransformationContext;

/// Predicate used by [`RejectAttributeChecker::Custom`]
pub type RejectPredicate =
    Arc<dyn Fn(&PathAddress, &str, &ModelNode, &TransformationContext) -> bool + Send + Sync>;

/// Rule flagging an attribute value as unsupported by the target version
#[derive(Clone)]
pub enum RejectAttributeChecker {
    /// Rejects any defined value; for attributes the target does not know
    Defined,
    /// Rejects values containing `${...}` expressions anywhere in the tree
    Expressions,
    /// Rejects one specific value
    Value(ModelNode),
    /// Rejects values outside `allowed`
    OneOf(Vec<ModelNode>),
    /// Caller-supplied rule
    Custom {
        /// Grouping id; rejections with the same id are reported together
        id: String,
        /// Leading text of the rejection message
        message: String,
        /// Returns `true` to reject
        predicate: RejectPredicate,
    },
}

impl RejectAttributeChecker {
    /// Custom checker
    pub fn custom<F>(id: impl Into<String>, message: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&PathAddress, &str, &ModelNode, &TransformationContext) -> bool
            + Send
            + Sync
            + 'static,
    {
        Self::Custom {
            id: id.into(),
            message: message.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Grouping id
    pub fn id(&self) -> &str {
        match self {
            Self::Defined => "defined",
            Self::Expressions => "expressions",
            Self::Value(_) => "value",
            Self::OneOf(_) => "one-of",
            Self::Custom { id, .. } => id,
        }
    }

    /// Whether `value` of `attribute` at `address` must be rejected
    pub fn rejects(
        &self,
        address: &PathAddress,
        attribute: &str,
        value: &ModelNode,
        context: &TransformationContext,
    ) -> bool {
        match self {
            Self::Defined => value.is_defined(),
            Self::Expressions => value.contains_expression(),
            Self::Value(rejected) => value == rejected,
            Self::OneOf(allowed) => value.is_defined() && !allowed.contains(value),
            Self::Custom { predicate, .. } => predicate(address, attribute, value, context),
        }
    }

    /// Message describing every rejected attribute in `values`
    pub fn message(&self, values: &IndexMap<String, ModelNode>) -> String {
        let names = attribute_list(values);
        match self {
            Self::Defined => format!(
                "attributes {names} are not understood in that model version and must be undefined"
            ),
            Self::Expressions => {
                format!("attributes {names} do not support expressions in that model version")
            }
            Self::Value(rejected) => {
                format!("attributes {names} may not be set to {rejected} in that model version")
            }
            Self::OneOf(allowed) => {
                let allowed = allowed
                    .iter()
                    .map(ModelNode::as_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(
                    "attributes {names} only accept [{allowed}] in that model version"
                )
            }
            Self::Custom { message, .. } => format!("{message}: {names}"),
        }
    }
}

fn attribute_list(values: &IndexMap<String, ModelNode>) -> String {
    let names: Vec<&str> = values.keys().map(String::as_str).collect();
    format!("[{}]", names.join(", "))
}

impl fmt::Debug for RejectAttributeChecker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Defined => f.write_str("Defined"),
            Self::Expressions => f.write_str("Expressions"),
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::OneOf(allowed) => f.debug_tuple("OneOf").field(allowed).finish(),
            Self::Custom { id, message, .. } => f
                .debug_struct("Custom")
                .field("id", id)
                .field("message", message)
                .finish_non_exhaustive(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TransformationTarget;
    use helm_core::ModelVersion;

    fn context() -> TransformationContext {
        TransformationContext::for_target(TransformationTarget::new(
            "s1",
            ModelVersion::new(1, 3, 0),
        ))
    }

    #[test]
    fn named_strategies() {
        let addr = PathAddress::root();
        let ctx = context();
        assert!(RejectAttributeChecker::Defined.rejects(&addr, "a", &ModelNode::from(1), &ctx));
        assert!(!RejectAttributeChecker::Defined.rejects(&addr, "a", &ModelNode::Undefined, &ctx));

        let expression = ModelNode::from(vec![ModelNode::from("${env.PORT:80}")]);
        assert!(RejectAttributeChecker::Expressions.rejects(&addr, "a", &expression, &ctx));
        assert!(!RejectAttributeChecker::Expressions.rejects(&addr, "a", &ModelNode::from("80"), &ctx));

        let one_of = RejectAttributeChecker::OneOf(vec!["a".into(), "b".into()]);
        assert!(one_of.rejects(&addr, "mode", &ModelNode::from("c"), &ctx));
        assert!(!one_of.rejects(&addr, "mode", &ModelNode::from("b"), &ctx));
    }

    #[test]
    fn custom_checker_sees_context() {
        let checker = RejectAttributeChecker::custom("too-large", "values above 10", |_, _, value, ctx| {
            ctx.version() < ModelVersion::new(2, 0, 0) && value.as_i64().is_some_and(|v| v > 10)
        });
        assert_eq!(checker.id(), "too-large");
        assert!(checker.rejects(&PathAddress::root(), "size", &ModelNode::from(11), &context()));

        let mut values = IndexMap::new();
        values.insert("size".to_string(), ModelNode::from(11));
        values.insert("limit".to_string(), ModelNode::from(12));
        assert_eq!(checker.message(&values), "values above 10: [size, limit]");
    }
}
