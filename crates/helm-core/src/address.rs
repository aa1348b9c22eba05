//! Resource addresses
//!
//! A [`PathAddress`] is an ordered sequence of `key=value` segments, written
//! as `/host=primary/server=s1/subsystem=logging`. The value `*` is a wildcard
//! matching any value for that key.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{HelmError, Result};
use crate::model::ModelNode;

/// Wildcard segment value
pub const WILDCARD: &str = "*";

/// One `key=value` segment of an address
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathElement {
    key: String,
    value: String,
}

impl PathElement {
    /// Create a segment, rejecting empty keys or values
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        let key = key.into();
        let value = value.into();
        if key.is_empty() || value.is_empty() {
            return Err(HelmError::invalid(format!(
                "invalid address segment '{key}={value}'"
            )));
        }
        if key.contains(['/', '=']) || value.contains(['/', '=']) {
            return Err(HelmError::invalid(format!(
                "address segment '{key}={value}' contains a reserved character"
            )));
        }
        Ok(Self { key, value })
    }

    /// Wildcard segment for `key`
    pub fn wildcard(key: impl Into<String>) -> Result<Self> {
        Self::new(key, WILDCARD)
    }

    /// Segment key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Segment value
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Whether the value is the wildcard
    pub fn is_wildcard(&self) -> bool {
        self.value == WILDCARD
    }

    /// Whether this segment, used as a pattern, matches `other`
    pub fn matches(&self, other: &PathElement) -> bool {
        self.key == other.key && (self.is_wildcard() || self.value == other.value)
    }
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Ordered resource address
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PathAddress {
    elements: Vec<PathElement>,
}

impl PathAddress {
    /// The root address
    pub fn root() -> Self {
        Self::default()
    }

    /// Build from segments
    pub fn from_elements(elements: Vec<PathElement>) -> Self {
        Self { elements }
    }

    /// Build from `(key, value)` pairs
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Result<Self>
    where
        K: Into<String>,
        V: Into<String>,
    {
        pairs
            .into_iter()
            .map(|(k, v)| PathElement::new(k, v))
            .collect::<Result<Vec<_>>>()
            .map(Self::from_elements)
    }

    /// Segments in order
    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether this is the root address
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Last segment, if any
    pub fn last(&self) -> Option<&PathElement> {
        self.elements.last()
    }

    /// New address with `element` appended
    pub fn append(&self, element: PathElement) -> Self {
        let mut elements = self.elements.clone();
        elements.push(element);
        Self { elements }
    }

    /// New address with all of `suffix` appended
    pub fn join(&self, suffix: &PathAddress) -> Self {
        let mut elements = self.elements.clone();
        elements.extend(suffix.elements.iter().cloned());
        Self { elements }
    }

    /// Address without its last segment
    pub fn parent(&self) -> Self {
        let end = self.elements.len().saturating_sub(1);
        Self {
            elements: self.elements[..end].to_vec(),
        }
    }

    /// Whether any segment is a wildcard
    pub fn is_multi_target(&self) -> bool {
        self.elements.iter().any(PathElement::is_wildcard)
    }

    /// Whether `prefix` is an exact leading subsequence of this address
    pub fn starts_with(&self, prefix: &PathAddress) -> bool {
        self.elements.len() >= prefix.elements.len()
            && self.elements.iter().zip(&prefix.elements).all(|(a, b)| a == b)
    }

    /// Remainder after `prefix`, or `None` when the prefix does not apply
    pub fn strip_prefix(&self, prefix: &PathAddress) -> Option<Self> {
        self.starts_with(prefix).then(|| Self {
            elements: self.elements[prefix.elements.len()..].to_vec(),
        })
    }

    /// Whether this address, used as a pattern, matches `concrete`
    pub fn matches(&self, concrete: &PathAddress) -> bool {
        self.elements.len() == concrete.elements.len()
            && self
                .elements
                .iter()
                .zip(&concrete.elements)
                .all(|(pattern, element)| pattern.matches(element))
    }

    /// List-of-objects form used inside operation and result nodes
    pub fn to_model_node(&self) -> ModelNode {
        ModelNode::List(
            self.elements
                .iter()
                .map(|e| ModelNode::object().with(e.key.clone(), e.value.clone()))
                .collect(),
        )
    }

    /// Parse the list-of-objects form, also accepting the string form
    pub fn from_model_node(node: &ModelNode) -> Result<Self> {
        match node {
            ModelNode::Undefined => Ok(Self::root()),
            ModelNode::String(text) => text.parse(),
            ModelNode::List(items) => {
                let mut elements = Vec::with_capacity(items.len());
                for item in items {
                    let mut entries = item.entries();
                    match (entries.next(), entries.next()) {
                        (Some((key, value)), None) => {
                            let value = value.as_str().ok_or_else(|| {
                                HelmError::invalid(format!(
                                    "address value for '{key}' is not a string"
                                ))
                            })?;
                            elements.push(PathElement::new(key, value)?);
                        }
                        _ => {
                            return Err(HelmError::invalid(format!(
                                "address segment {item} must hold exactly one key"
                            )))
                        }
                    }
                }
                Ok(Self { elements })
            }
            other => Err(HelmError::invalid(format!(
                "cannot interpret {other} as an address"
            ))),
        }
    }
}

impl fmt::Display for PathAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.elements.is_empty() {
            return f.write_str("/");
        }
        for element in &self.elements {
            write!(f, "/{element}")?;
        }
        Ok(())
    }
}

impl FromStr for PathAddress {
    type Err = HelmError;

    fn from_str(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        if !trimmed.starts_with('/') {
            return Err(HelmError::invalid(format!(
                "address '{text}' must start with '/'"
            )));
        }
        trimmed
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| {
                let (key, value) = segment.split_once('=').ok_or_else(|| {
                    HelmError::invalid(format!("address segment '{segment}' has no '='"))
                })?;
                PathElement::new(key, value)
            })
            .collect::<Result<Vec<_>>>()
            .map(Self::from_elements)
    }
}

impl TryFrom<String> for PathAddress {
    type Error = HelmError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<PathAddress> for String {
    fn from(address: PathAddress) -> Self {
        address.to_string()
    }
}
