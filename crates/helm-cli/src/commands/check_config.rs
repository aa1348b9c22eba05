//! `helm check-config`

use anyhow::{Context, Result};
use helm_core::HelmConfig;
use std::path::Path;

/// Load and validate `path`, printing the effective settings
pub fn run(path: &Path) -> Result<()> {
    let config = HelmConfig::load(Some(path))
        .with_context(|| format!("invalid configuration in {}", path.display()))?;

    println!("{}: ok", path.display());
    println!("  coordinator.timeout_ms = {}", config.coordinator.timeout_ms);
    println!(
        "  coordinator.dispatch_concurrency = {}",
        config.coordinator.dispatch_concurrency
    );
    println!(
        "  transformation.ignored_resource_list_version = {}",
        config.transformation.ignored_resource_list_version
    );
    println!(
        "  transformation.describe_attribute_support_version = {}",
        config.transformation.describe_attribute_support_version
    );
    println!("  logging.filter = {}", config.logging.filter);
    Ok(())
}
