//! Helm configuration
//!
//! Configuration is layered: built-in defaults, then a TOML file, then
//! `HELM_SECTION__FIELD` environment variables. Every section is optional in
//! the file.
//!
//! ```toml
//! [coordinator]
//! timeout_ms = 30000
//! dispatch_concurrency = 8
//!
//! [transformation]
//! ignored_resource_list_version = "1.4.0"
//! describe_attribute_support_version = "2.0.0"
//!
//! [logging]
//! filter = "info,helm_coordinator=debug"
//! ```

mod traits;
mod validation;

pub use traits::{ConfigValidation, HelmConfigLoader, ENV_PREFIX};
pub use validation::{ConfigValidator, ValidationError, ValidationResult};

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::{HelmError, Result};
use crate::version::ModelVersion;

/// Coordinator settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoordinatorConfig {
    /// Deadline for each protocol phase, enforced by the deadline layer
    pub timeout_ms: u64,
    /// Maximum participants dispatched concurrently by a rollout
    pub dispatch_concurrency: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            dispatch_concurrency: 8,
        }
    }
}

/// Version-transformation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransformationConfig {
    /// First participant version able to declare ignored resources at
    /// registration time; rejections against it and later are hard errors
    pub ignored_resource_list_version: ModelVersion,
    /// First participant version that understands `read-attribute-description`
    pub describe_attribute_support_version: ModelVersion,
}

impl Default for TransformationConfig {
    fn default() -> Self {
        Self {
            ignored_resource_list_version: ModelVersion::new(1, 4, 0),
            describe_attribute_support_version: ModelVersion::new(2, 0, 0),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HelmConfig {
    /// `[coordinator]` section
    pub coordinator: CoordinatorConfig,
    /// `[transformation]` section
    pub transformation: TransformationConfig,
    /// `[logging]` section
    pub logging: LoggingConfig,
}

impl HelmConfig {
    /// Parse TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Defaults, then `path` if given, then the environment; validated
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        config.merge_with_env()?;
        HelmConfigLoader::validate(&config)?;
        Ok(config)
    }
}

fn parse_field<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| HelmError::config(format!("invalid value '{value}' for '{key}'")))
}

impl HelmConfigLoader for HelmConfig {
    const SECTIONS: &'static [&'static str] = &["coordinator", "transformation", "logging"];

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            HelmError::config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    fn set_from_string(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "coordinator.timeout_ms" => self.coordinator.timeout_ms = parse_field(key, value)?,
            "coordinator.dispatch_concurrency" => {
                self.coordinator.dispatch_concurrency = parse_field(key, value)?;
            }
            "transformation.ignored_resource_list_version" => {
                self.transformation.ignored_resource_list_version = parse_field(key, value)?;
            }
            "transformation.describe_attribute_support_version" => {
                self.transformation.describe_attribute_support_version =
                    parse_field(key, value)?;
            }
            "logging.filter" => self.logging.filter = value.to_string(),
            other => {
                return Err(HelmError::config(format!(
                    "unknown configuration key '{other}'"
                )))
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        ConfigValidation::validate(self)
    }
}

impl ConfigValidation for HelmConfig {
    fn validate(&self) -> Result<()> {
        let root = ConfigValidator::new();

        let mut coordinator = root.for_field("coordinator");
        coordinator
            .range("timeout_ms", self.coordinator.timeout_ms, Some(1), None)
            .range(
                "dispatch_concurrency",
                self.coordinator.dispatch_concurrency as u64,
                Some(1),
                Some(1024),
            );

        let mut logging = root.for_field("logging");
        logging.custom(
            "filter",
            &self.logging.filter,
            |f| !f.trim().is_empty(),
            "must not be empty",
        );

        let mut validator = root;
        validator.merge(coordinator);
        validator.merge(logging);
        validator.result().map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = HelmConfig::default();
        assert!(ConfigValidation::validate(&config).is_ok());
        assert_eq!(
            config.transformation.ignored_resource_list_version,
            ModelVersion::new(1, 4, 0)
        );
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = HelmConfig::from_toml_str("[coordinator]\ntimeout_ms = 500\n").unwrap();
        assert_eq!(config.coordinator.timeout_ms, 500);
        assert_eq!(config.coordinator.dispatch_concurrency, 8);
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(HelmConfig::from_toml_str("[coordinator]\ntimeout = 5\n").is_err());
    }

    #[test]
    fn env_layer_overrides_file() {
        let mut config = HelmConfig::default();
        config
            .merge_with_vars(vec![
                ("HELM_COORDINATOR__TIMEOUT_MS".to_string(), "1200".to_string()),
                (
                    "HELM_TRANSFORMATION__IGNORED_RESOURCE_LIST_VERSION".to_string(),
                    "2.1".to_string(),
                ),
                ("PATH".to_string(), "/usr/bin".to_string()),
                ("HELM_NAMESPACE".to_string(), "default".to_string()),
                ("HELM_CACHE_HOME".to_string(), "/tmp/helm".to_string()),
                ("HELM_PLUGINS__DIR".to_string(), "/tmp/plugins".to_string()),
            ])
            .unwrap();
        assert_eq!(config.coordinator.timeout_ms, 1200);
        assert_eq!(
            config.transformation.ignored_resource_list_version,
            ModelVersion::new(2, 1, 0)
        );

        let err = config
            .merge_with_vars(vec![("HELM_COORDINATOR__TIMEOUT_MS".to_string(), "soon".to_string())])
            .unwrap_err();
        assert!(matches!(err, HelmError::Config { .. }));
        let err = config
            .merge_with_vars(vec![("HELM_COORDINATOR__RETRIES".to_string(), "3".to_string())])
            .unwrap_err();
        assert!(err.to_string().contains("coordinator.retries"));
    }

    #[test]
    fn validation_reports_zero_concurrency() {
        let mut config = HelmConfig::default();
        config.coordinator.dispatch_concurrency = 0;
        let err = ConfigValidation::validate(&config).unwrap_err();
        assert!(err.to_string().contains("dispatch_concurrency"));
    }
}
