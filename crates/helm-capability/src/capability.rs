//! Capability descriptors and registrations.

use helm_core::{HelmError, PathAddress, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// How a capability was declared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityKind {
    /// Declared through the pre-model registration path
    Legacy,
    /// Declared by a resource definition; the canonical kind
    Modeled,
}

/// Name of something a resource offers to the rest of the system once present
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Capability {
    name: String,
    kind: CapabilityKind,
}

impl Capability {
    /// Modeled capability
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: CapabilityKind::Modeled,
        }
    }

    /// Legacy capability; normalized to the modeled form on lookup
    pub fn legacy(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: CapabilityKind::Legacy,
        }
    }

    /// Dynamic capability: `base` qualified by one or more elements,
    /// e.g. `org.helm.data-source` + `ExampleDS`
    pub fn dynamic(base: &str, elements: &[&str]) -> Self {
        let mut name = base.to_string();
        for element in elements {
            name.push('.');
            name.push_str(element);
        }
        Self::new(name)
    }

    /// Capability name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declaration kind
    pub fn kind(&self) -> CapabilityKind {
        self.kind
    }

    /// Canonical (modeled) form used for comparison and lookup
    pub fn canonical(&self) -> Capability {
        Self::new(self.name.clone())
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(HelmError::invalid("capability name must not be empty"));
        }
        if self.name.chars().any(char::is_whitespace) {
            return Err(HelmError::invalid(format!(
                "capability name '{}' must not contain whitespace",
                self.name
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A capability together with every address that declares it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityRegistration {
    capability: Capability,
    points: BTreeSet<PathAddress>,
}

impl CapabilityRegistration {
    pub(crate) fn new(capability: Capability) -> Self {
        Self {
            capability,
            points: BTreeSet::new(),
        }
    }

    /// Canonical capability
    pub fn capability(&self) -> &Capability {
        &self.capability
    }

    /// Registration points, in address order
    pub fn points(&self) -> &BTreeSet<PathAddress> {
        &self.points
    }

    pub(crate) fn points_mut(&mut self) -> &mut BTreeSet<PathAddress> {
        &mut self.points
    }
}
