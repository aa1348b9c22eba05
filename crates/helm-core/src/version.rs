//! Management model versions
//!
//! Every participant advertises the version of the management model it
//! implements. Versions order lexicographically on `(major, minor, micro)`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{HelmError, Result};

/// Version of a participant's management model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModelVersion {
    /// Major version number - increment for incompatible changes
    pub major: u16,
    /// Minor version number - increment for backwards-compatible additions
    pub minor: u16,
    /// Micro version number - increment for backwards-compatible fixes
    pub micro: u16,
}

impl ModelVersion {
    /// Create a new model version
    pub const fn new(major: u16, minor: u16, micro: u16) -> Self {
        Self {
            major,
            minor,
            micro,
        }
    }

    /// Check if this version is at least `other`
    pub fn is_at_least(&self, other: &Self) -> bool {
        self >= other
    }

    /// Check if this version is older than `other`
    pub fn is_older_than(&self, other: &Self) -> bool {
        self < other
    }
}

impl fmt::Display for ModelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)
    }
}

impl FromStr for ModelVersion {
    type Err = HelmError;

    fn from_str(text: &str) -> Result<Self> {
        let mut parts = text.trim().split('.');
        let mut next = |name: &str, required: bool| -> Result<u16> {
            match parts.next() {
                Some(part) => part.parse().map_err(|_| {
                    HelmError::invalid(format!("invalid {name} component in version '{text}'"))
                }),
                None if required => Err(HelmError::invalid(format!(
                    "version '{text}' is missing its {name} component"
                ))),
                None => Ok(0),
            }
        };
        let major = next("major", true)?;
        let minor = next("minor", true)?;
        let micro = next("micro", false)?;
        if parts.next().is_some() {
            return Err(HelmError::invalid(format!(
                "version '{text}' has too many components"
            )));
        }
        Ok(Self::new(major, minor, micro))
    }
}

impl TryFrom<String> for ModelVersion {
    type Error = HelmError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ModelVersion> for String {
    fn from(version: ModelVersion) -> Self {
        version.to_string()
    }
}
