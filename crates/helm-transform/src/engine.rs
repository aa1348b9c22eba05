//! Transformation engine
//!
//! Adapts outbound operations and stored resource models for a participant
//! running an older model version, and supplies the transformer for the
//! participant's reply.
//!
//! Rejections are reported according to the mode of the check:
//! - **resource mode** (`add`, stored models): a hard
//!   [`HelmError::VersionIncompatible`] aggregating every group when the target
//!   is at or above the ignored-resource-list version, else a warning
//! - **parameter mode** (every other operation): always a warning
//!
//! Warnings only describe the first rejection group.

use helm_core::operation::{names, params};
use helm_core::{HelmError, ModelNode, Operation, PathAddress, Result};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::accumulator::RejectionAccumulator;
use crate::context::TransformationContext;
use crate::description::ResourceTransformationDescription;
use crate::registry::TransformerRegistry;
use crate::result::{
    AttributeDescriptionTransformer, DiscardedResultTransformer, IdentityResultTransformer,
    OperationResultTransformer,
};

/// Outcome of adapting one operation
#[derive(Debug, Clone)]
pub struct OperationTransformation {
    /// Operation to send; the input `Arc` itself when nothing changed
    pub operation: Arc<Operation>,
    /// Adapts the participant's reply
    pub result_transformer: Arc<dyn OperationResultTransformer>,
    /// Non-fatal rejection report
    pub warning: Option<String>,
    /// The operation must not be sent; its reply is synthesized locally
    pub discarded: bool,
}

impl OperationTransformation {
    fn untouched(operation: Arc<Operation>) -> Self {
        Self {
            operation,
            result_transformer: Arc::new(IdentityResultTransformer),
            warning: None,
            discarded: false,
        }
    }

    /// Adapt the participant's raw reply
    pub fn transform_result(&self, raw: ModelNode) -> ModelNode {
        self.result_transformer.transform_result(raw)
    }
}

/// Outcome of adapting stored resource models
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceTransformation {
    /// Adapted models, in input order
    pub models: Vec<ModelNode>,
    /// Non-fatal rejection report
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CheckMode {
    Resource,
    Parameter,
}

/// Engine applying registered [`ResourceTransformationDescription`]s
#[derive(Debug, Clone, Default)]
pub struct TransformationEngine {
    registry: Arc<TransformerRegistry>,
}

impl TransformationEngine {
    /// Engine over `registry`
    pub fn new(registry: Arc<TransformerRegistry>) -> Self {
        Self { registry }
    }

    /// Registry of descriptions
    pub fn registry(&self) -> &Arc<TransformerRegistry> {
        &self.registry
    }

    /// Adapt `operation`, addressed to `address` on the participant, for
    /// the target in `context`.
    ///
    /// Fails with [`HelmError::VersionIncompatible`] for resource-mode
    /// rejections against modern targets, and with [`HelmError::Invalid`]
    /// for a malformed `read-attribute-description`. Nothing is sent in
    /// either case.
    pub fn transform_operation(
        &self,
        context: &TransformationContext,
        address: &PathAddress,
        operation: Arc<Operation>,
    ) -> Result<OperationTransformation> {
        if operation.name() == names::READ_ATTRIBUTE_DESCRIPTION
            && !context.supports_attribute_description()
        {
            return rewrite_attribute_description(context, &operation);
        }

        let Some(description) = self.registry.resolve(address, context.version()) else {
            return Ok(OperationTransformation::untouched(operation));
        };

        let name = operation.name().to_owned();
        match name.as_str() {
            names::ADD => transform_add(context, address, operation, &description),
            names::WRITE_ATTRIBUTE | names::UNDEFINE_ATTRIBUTE => {
                transform_attribute_write(context, address, operation, &description)
            }
            _ => {
                let mut rejections = RejectionAccumulator::new();
                for (parameter, value) in operation.parameters().entries() {
                    description.check_attribute(address, parameter, value, context, &mut rejections);
                }
                let warning = report(context, address, &operation, &rejections, CheckMode::Parameter)?;
                Ok(OperationTransformation {
                    warning,
                    ..OperationTransformation::untouched(operation)
                })
            }
        }
    }

    /// Adapt one stored resource model in resource mode
    pub fn transform_resource(
        &self,
        context: &TransformationContext,
        address: &PathAddress,
        model: &ModelNode,
    ) -> Result<ResourceTransformation> {
        self.transform_resources(context, &[(address.clone(), model.clone())])
    }

    /// Adapt the instances of a wildcard read in resource mode.
    ///
    /// Each instance is checked on its own; rejections are merged by checker
    /// id and reported once for the whole set.
    pub fn transform_resources(
        &self,
        context: &TransformationContext,
        instances: &[(PathAddress, ModelNode)],
    ) -> Result<ResourceTransformation> {
        let mut rejections = RejectionAccumulator::new();
        let mut models = Vec::with_capacity(instances.len());

        for (address, model) in instances {
            let mut model = model.clone();
            if let Some(description) = self.registry.resolve(address, context.version()) {
                let mut instance_rejections = RejectionAccumulator::new();
                description.apply_to_attributes(address, &mut model, context, &mut instance_rejections);
                rejections.merge(instance_rejections);
            }
            models.push(model);
        }

        let subject = match instances {
            [(address, _)] => address.to_string(),
            _ => format!("{} resources", instances.len()),
        };
        let warning = if rejections.is_empty() {
            None
        } else if context.rejections_are_fatal() {
            let message = format!(
                "resource models for {subject} cannot be sent to {}: {}",
                context.target(),
                rejections.aggregated_message()
            );
            warn!(target_host = %context.target(), "{message}");
            return Err(HelmError::version_incompatible(message));
        } else {
            first_group_warning(context, &subject, &rejections)
        };

        Ok(ResourceTransformation { models, warning })
    }
}

fn transform_add(
    context: &TransformationContext,
    address: &PathAddress,
    operation: Arc<Operation>,
    description: &ResourceTransformationDescription,
) -> Result<OperationTransformation> {
    let mut parameters = operation.parameters().clone();
    let mut rejections = RejectionAccumulator::new();
    let changed = description.apply_to_attributes(address, &mut parameters, context, &mut rejections);
    let warning = report(context, address, &operation, &rejections, CheckMode::Resource)?;

    let operation = if changed {
        Arc::new(operation.with_parameters(operation.name(), parameters))
    } else {
        operation
    };
    Ok(OperationTransformation {
        warning,
        ..OperationTransformation::untouched(operation)
    })
}

fn transform_attribute_write(
    context: &TransformationContext,
    address: &PathAddress,
    operation: Arc<Operation>,
    description: &ResourceTransformationDescription,
) -> Result<OperationTransformation> {
    let Some(attribute) = operation.param(params::NAME).as_str().map(str::to_string) else {
        return Err(HelmError::invalid(format!(
            "{operation} is missing the '{}' parameter",
            params::NAME
        )));
    };
    let value = operation.param(params::VALUE);

    if description.discards(&attribute, value) {
        debug!(operation = %operation, attribute = %attribute, "Discarding attribute write");
        return Ok(OperationTransformation {
            result_transformer: Arc::new(DiscardedResultTransformer),
            discarded: true,
            ..OperationTransformation::untouched(operation)
        });
    }

    let mut rejections = RejectionAccumulator::new();
    description.check_attribute(address, &attribute, value, context, &mut rejections);
    let warning = report(context, address, &operation, &rejections, CheckMode::Parameter)?;

    let renamed = description.renamed(&attribute);
    let operation = if renamed != attribute {
        let parameters = operation.parameters().clone().with(params::NAME, renamed);
        Arc::new(operation.with_parameters(operation.name(), parameters))
    } else {
        operation
    };
    Ok(OperationTransformation {
        warning,
        ..OperationTransformation::untouched(operation)
    })
}

fn rewrite_attribute_description(
    context: &TransformationContext,
    operation: &Operation,
) -> Result<OperationTransformation> {
    let Some(attribute) = operation.param(params::NAME).as_str() else {
        return Err(HelmError::invalid(format!(
            "{operation} is missing the '{}' parameter",
            params::NAME
        )));
    };
    debug!(
        operation = %operation,
        target_host = %context.target(),
        "Rewriting read-attribute-description as read-resource-description"
    );
    let parameters = ModelNode::object()
        .with(params::RECURSIVE, false)
        .with(params::ACCESS_CONTROL, params::COMBINED_DESCRIPTIONS)
        .with(params::INHERITED, false);
    Ok(OperationTransformation {
        operation: Arc::new(operation.with_parameters(names::READ_RESOURCE_DESCRIPTION, parameters)),
        result_transformer: Arc::new(AttributeDescriptionTransformer::new(attribute)),
        warning: None,
        discarded: false,
    })
}

fn report(
    context: &TransformationContext,
    address: &PathAddress,
    operation: &Operation,
    rejections: &RejectionAccumulator,
    mode: CheckMode,
) -> Result<Option<String>> {
    if rejections.is_empty() {
        return Ok(None);
    }
    let subject = format!("operation '{}' at {address}", operation.name());
    if mode == CheckMode::Resource && context.rejections_are_fatal() {
        let message = format!(
            "{subject} cannot be sent to {}: {}",
            context.target(),
            rejections.aggregated_message()
        );
        warn!(operation = %operation, target_host = %context.target(), "{message}");
        return Err(HelmError::version_incompatible(message));
    }
    Ok(first_group_warning(context, &subject, rejections))
}

fn first_group_warning(
    context: &TransformationContext,
    subject: &str,
    rejections: &RejectionAccumulator,
) -> Option<String> {
    let group = rejections.first_group()?;
    let warning = format!(
        "{subject} was sent to {} with unsupported values: {}",
        context.target(),
        group.message()
    );
    debug!(target_host = %context.target(), groups = rejections.len(), "{warning}");
    Some(warning)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::RejectAttributeChecker;
    use crate::context::TransformationTarget;
    use helm_core::ModelVersion;

    fn addr(text: &str) -> PathAddress {
        text.parse().unwrap()
    }

    fn context(major: u16, minor: u16) -> TransformationContext {
        TransformationContext::for_target(TransformationTarget::new(
            "s1",
            ModelVersion::new(major, minor, 0),
        ))
    }

    #[test]
    fn unregistered_addresses_keep_the_same_operation() {
        let engine = TransformationEngine::default();
        let op = Arc::new(Operation::new(names::ADD, addr("/subsystem=x")).unwrap().with_param("a", 1));
        let out = engine
            .transform_operation(&context(1, 0), op.address(), op.clone())
            .unwrap();
        assert!(Arc::ptr_eq(&out.operation, &op));
        assert!(out.warning.is_none());
        assert!(!out.discarded);
    }

    #[test]
    fn rewrites_attribute_description_for_old_targets() {
        let engine = TransformationEngine::default();
        let op = Arc::new(
            Operation::new(names::READ_ATTRIBUTE_DESCRIPTION, addr("/subsystem=x"))
                .unwrap()
                .with_param(params::NAME, "X"),
        );
        let out = engine
            .transform_operation(&context(1, 8), op.address(), op.clone())
            .unwrap();
        assert_eq!(out.operation.name(), names::READ_RESOURCE_DESCRIPTION);
        assert_eq!(out.operation.id(), op.id());
        assert_eq!(out.operation.param(params::RECURSIVE).as_bool(), Some(false));
        assert_eq!(out.operation.param(params::INHERITED).as_bool(), Some(false));
        assert_eq!(
            out.operation.param(params::ACCESS_CONTROL).as_str(),
            Some(params::COMBINED_DESCRIPTIONS)
        );

        let modern = engine
            .transform_operation(&context(2, 0), op.address(), op.clone())
            .unwrap();
        assert!(Arc::ptr_eq(&modern.operation, &op));
    }

    #[test]
    fn missing_attribute_name_is_a_client_rejection() {
        let engine = TransformationEngine::default();
        let op = Arc::new(Operation::new(names::READ_ATTRIBUTE_DESCRIPTION, addr("/a=b")).unwrap());
        let err = engine
            .transform_operation(&context(1, 0), op.address(), op.clone())
            .unwrap_err();
        assert!(matches!(err, HelmError::Invalid { .. }));
    }

    #[test]
    fn discarded_writes_are_not_sent() {
        let registry = Arc::new(TransformerRegistry::new());
        registry.register(
            addr("/subsystem=x"),
            ModelVersion::new(1, 9, 0),
            ResourceTransformationDescription::builder()
                .discard("statistics", crate::description::DiscardPolicy::Always)
                .build(),
        );
        let engine = TransformationEngine::new(registry);
        let op = Arc::new(
            Operation::new(names::WRITE_ATTRIBUTE, addr("/subsystem=x"))
                .unwrap()
                .with_param(params::NAME, "statistics")
                .with_param(params::VALUE, true),
        );
        let out = engine
            .transform_operation(&context(1, 2), op.address(), op.clone())
            .unwrap();
        assert!(out.discarded);
        assert!(helm_core::outcome::is_success(
            &out.transform_result(ModelNode::Undefined)
        ));
    }

    #[test]
    fn parameter_mode_never_fails() {
        let registry = Arc::new(TransformerRegistry::new());
        registry.register(
            addr("/subsystem=x"),
            ModelVersion::new(1, 9, 0),
            ResourceTransformationDescription::builder()
                .reject("port", RejectAttributeChecker::Expressions)
                .rename("port", "socket-port")
                .build(),
        );
        let engine = TransformationEngine::new(registry);
        let op = Arc::new(
            Operation::new(names::WRITE_ATTRIBUTE, addr("/subsystem=x"))
                .unwrap()
                .with_param(params::NAME, "port")
                .with_param(params::VALUE, "${port:80}"),
        );
        let out = engine
            .transform_operation(&context(1, 5), op.address(), op.clone())
            .unwrap();
        let warning = out.warning.unwrap();
        assert!(warning.contains("port"), "{warning}");
        assert_eq!(out.operation.param(params::NAME).as_str(), Some("socket-port"));
    }
}
