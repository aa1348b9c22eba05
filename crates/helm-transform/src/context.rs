//! Target description passed to every transformation.

use helm_core::config::TransformationConfig;
use helm_core::ModelVersion;
use std::fmt;

/// Participant an operation or model is being adapted for
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransformationTarget {
    name: String,
    version: ModelVersion,
}

impl TransformationTarget {
    /// Target named `name` running `version`
    pub fn new(name: impl Into<String>, version: ModelVersion) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }

    /// Participant name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Participant model version
    pub fn version(&self) -> ModelVersion {
        self.version
    }
}

impl fmt::Display for TransformationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.version)
    }
}

/// Target plus the version thresholds that switch engine behaviour
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformationContext {
    target: TransformationTarget,
    thresholds: TransformationConfig,
}

impl TransformationContext {
    /// Context with explicit thresholds
    pub fn new(target: TransformationTarget, thresholds: TransformationConfig) -> Self {
        Self { target, thresholds }
    }

    /// Context with default thresholds
    pub fn for_target(target: TransformationTarget) -> Self {
        Self::new(target, TransformationConfig::default())
    }

    /// Participant being adapted for
    pub fn target(&self) -> &TransformationTarget {
        &self.target
    }

    /// Participant model version
    pub fn version(&self) -> ModelVersion {
        self.target.version
    }

    /// Whether resource-mode rejections are hard errors for this target.
    ///
    /// Targets at or above the ignored-resource-list version declare the
    /// resources they ignore, so anything they do receive must be understood.
    pub fn rejections_are_fatal(&self) -> bool {
        self.target
            .version
            .is_at_least(&self.thresholds.ignored_resource_list_version)
    }

    /// Whether the target understands `read-attribute-description`
    pub fn supports_attribute_description(&self) -> bool {
        self.target
            .version
            .is_at_least(&self.thresholds.describe_attribute_support_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_are_inclusive() {
        let at = TransformationContext::for_target(TransformationTarget::new(
            "s1",
            ModelVersion::new(1, 4, 0),
        ));
        let below = TransformationContext::for_target(TransformationTarget::new(
            "s2",
            ModelVersion::new(1, 3, 9),
        ));
        assert!(at.rejections_are_fatal());
        assert!(!below.rejections_are_fatal());
        assert!(!at.supports_attribute_description());
    }
}
