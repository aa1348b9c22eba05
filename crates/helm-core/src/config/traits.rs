//! Core configuration traits

use crate::HelmError;
use std::path::Path;
use tracing::debug;

/// Prefix of environment variables read by [`HelmConfigLoader::merge_with_env`]
pub const ENV_PREFIX: &str = "HELM_";

/// Loading, layering and validation contract for Helm configuration types
pub trait HelmConfigLoader: Clone + Default + Send + Sync + 'static {
    /// Top-level sections addressable from the environment
    const SECTIONS: &'static [&'static str];

    /// Load configuration from a file
    fn load_from_file(path: &Path) -> Result<Self, HelmError>;

    /// Set a configuration value addressed by a dotted key (`section.field`)
    fn set_from_string(&mut self, key: &str, value: &str) -> Result<(), HelmError>;

    /// Validate the configuration
    fn validate(&self) -> Result<(), HelmError>;

    /// Merge `HELM_SECTION__FIELD=value` pairs over the current values.
    ///
    /// Variables whose section is not one of [`Self::SECTIONS`] belong to
    /// other tools sharing the prefix and are skipped.
    fn merge_with_vars<I>(&mut self, vars: I) -> Result<(), HelmError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(config_key) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let config_key = config_key.to_lowercase();
            let known = config_key
                .split_once("__")
                .is_some_and(|(section, _)| Self::SECTIONS.iter().any(|known| *known == section));
            if !known {
                debug!(variable = %key, "Skipping environment variable outside the configuration");
                continue;
            }
            let dotted = config_key.replace("__", ".");
            debug!(key = %dotted, "Applying configuration override");
            self.set_from_string(&dotted, &value)?;
        }
        Ok(())
    }

    /// Merge the process environment
    fn merge_with_env(&mut self) -> Result<(), HelmError> {
        self.merge_with_vars(std::env::vars())
    }
}

/// Trait for configuration validation
pub trait ConfigValidation {
    /// Validate this configuration
    fn validate(&self) -> Result<(), HelmError>;
}
