//! Operation descriptors
//!
//! An [`Operation`] is immutable once submitted. Callers share it as
//! `Arc<Operation>`; layers that need a different address or parameters build
//! a new descriptor with [`Operation::with_address`] or
//! [`Operation::with_parameters`] and leave the original untouched.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::address::PathAddress;
use crate::errors::{HelmError, Result};
use crate::model::ModelNode;

/// Well-known operation names
pub mod names {
    /// Create a resource
    pub const ADD: &str = "add";
    /// Remove a resource
    pub const REMOVE: &str = "remove";
    /// Write one attribute
    pub const WRITE_ATTRIBUTE: &str = "write-attribute";
    /// Clear one attribute
    pub const UNDEFINE_ATTRIBUTE: &str = "undefine-attribute";
    /// Read a resource
    pub const READ_RESOURCE: &str = "read-resource";
    /// Describe a whole resource
    pub const READ_RESOURCE_DESCRIPTION: &str = "read-resource-description";
    /// Describe one attribute of a resource
    pub const READ_ATTRIBUTE_DESCRIPTION: &str = "read-attribute-description";
}

/// Well-known parameter names
pub mod params {
    /// Attribute name parameter
    pub const NAME: &str = "name";
    /// Attribute value parameter
    pub const VALUE: &str = "value";
    /// Recurse into children
    pub const RECURSIVE: &str = "recursive";
    /// Access-control description mode
    pub const ACCESS_CONTROL: &str = "access-control";
    /// Include inherited operations and attributes
    pub const INHERITED: &str = "inherited";
    /// Combined access-control descriptions
    pub const COMBINED_DESCRIPTIONS: &str = "combined-descriptions";
}

/// Correlation id of a submitted operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OperationId(pub Uuid);

impl OperationId {
    /// Fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op:{}", &self.0.simple().to_string()[..8])
    }
}

/// Opaque reference to a large payload streamed alongside an operation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttachmentRef(pub String);

/// Immutable description of one management operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    id: OperationId,
    name: String,
    address: PathAddress,
    parameters: ModelNode,
    attachments: Vec<AttachmentRef>,
}

impl Operation {
    /// Create an operation with no parameters
    pub fn new(name: impl Into<String>, address: PathAddress) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(HelmError::invalid("operation name must not be empty"));
        }
        Ok(Self {
            id: OperationId::new(),
            name,
            address,
            parameters: ModelNode::object(),
            attachments: Vec::new(),
        })
    }

    /// Builder: set a parameter
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<ModelNode>) -> Self {
        self.parameters.set(key, value);
        self
    }

    /// Builder: add an attachment reference
    pub fn with_attachment(mut self, attachment: AttachmentRef) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Copy of this operation targeting `address`, keeping its id
    pub fn with_address(&self, address: PathAddress) -> Self {
        Self {
            address,
            ..self.clone()
        }
    }

    /// Copy of this operation with `name` and `parameters` replaced, keeping its id
    pub fn with_parameters(&self, name: impl Into<String>, parameters: ModelNode) -> Self {
        Self {
            name: name.into(),
            parameters,
            ..self.clone()
        }
    }

    /// Correlation id
    pub fn id(&self) -> OperationId {
        self.id
    }

    /// Operation name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Target address
    pub fn address(&self) -> &PathAddress {
        &self.address
    }

    /// Parameter tree
    pub fn parameters(&self) -> &ModelNode {
        &self.parameters
    }

    /// Single parameter, undefined when absent
    pub fn param(&self, key: &str) -> &ModelNode {
        self.parameters.get(key)
    }

    /// Attachment references
    pub fn attachments(&self) -> &[AttachmentRef] {
        &self.attachments
    }

    /// Flat node form: `operation`, `address`, then the parameters
    pub fn to_model_node(&self) -> ModelNode {
        let mut node = ModelNode::object()
            .with("operation", self.name.clone())
            .with("address", self.address.to_model_node());
        for (key, value) in self.parameters.entries() {
            node.set(key, value.clone());
        }
        node
    }

    /// Parse the flat node form
    pub fn from_model_node(node: &ModelNode) -> Result<Self> {
        let name = node
            .get("operation")
            .as_str()
            .ok_or_else(|| HelmError::invalid("operation node has no 'operation' name"))?;
        let address = PathAddress::from_model_node(node.get("address"))?;
        let mut operation = Self::new(name, address)?;
        for (key, value) in node.entries() {
            if key != "operation" && key != "address" {
                operation.parameters.set(key, value.clone());
            }
        }
        Ok(operation)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrite_keeps_identity_and_params() {
        let op = Operation::new(names::ADD, "/host=primary/subsystem=x".parse().unwrap())
            .unwrap()
            .with_param("enabled", true);
        let moved = op.with_address("/subsystem=x".parse().unwrap());
        assert_eq!(moved.id(), op.id());
        assert_eq!(moved.param("enabled"), &ModelNode::Boolean(true));
        assert_eq!(op.address().to_string(), "/host=primary/subsystem=x");
    }

    #[test]
    fn node_form_round_trip() {
        let op = Operation::new(names::WRITE_ATTRIBUTE, "/subsystem=x".parse().unwrap())
            .unwrap()
            .with_param(params::NAME, "level")
            .with_param(params::VALUE, "DEBUG");
        let parsed = Operation::from_model_node(&op.to_model_node()).unwrap();
        assert_eq!(parsed.name(), op.name());
        assert_eq!(parsed.address(), op.address());
        assert_eq!(parsed.parameters(), op.parameters());
    }

    #[test]
    fn empty_name_is_rejected() {
        assert!(Operation::new("  ", PathAddress::root()).is_err());
    }
}
