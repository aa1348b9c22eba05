//! Unified error system for Helm
//!
//! A single error type shared by every crate in the workspace. Variants follow
//! the management error taxonomy: client rejections fail before any remote
//! interaction, transport failures and cancellations are normally absorbed into
//! outcome nodes by the coordinator, and only setup errors escape as `Err`.

use serde::{Deserialize, Serialize};

use crate::outcome::ErrorCode;

/// Unified error type for all Helm operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum HelmError {
    /// Malformed request or argument, rejected before any remote interaction
    #[error("Invalid: {message}")]
    Invalid {
        /// Error message describing the invalid input
        message: String,
    },

    /// Resource, participant or capability not found
    #[error("Not found: {message}")]
    NotFound {
        /// Error message describing what was not found
        message: String,
    },

    /// I/O failure talking to a participant
    #[error("Transport error: {message}")]
    Transport {
        /// Error message describing the transport failure
        message: String,
    },

    /// Administrative cancellation of an in-flight operation
    #[error("Cancelled: {message}")]
    Cancelled {
        /// Error message describing the cancellation
        message: String,
    },

    /// Deadline exceeded while waiting on a participant
    #[error("Timeout: {message}")]
    Timeout {
        /// Error message describing the timeout
        message: String,
    },

    /// Target participant cannot accept the request at its model version
    #[error("Version incompatible: {message}")]
    VersionIncompatible {
        /// Aggregated rejection message
        message: String,
    },

    /// Configuration could not be loaded or is invalid
    #[error("Config error: {message}")]
    Config {
        /// Error message describing the configuration problem
        message: String,
    },

    /// Internal system error
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal error
        message: String,
    },
}

impl HelmError {
    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a cancellation error
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::Cancelled {
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Create a version incompatibility error
    pub fn version_incompatible(message: impl Into<String>) -> Self {
        Self::VersionIncompatible {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// The bare message without the variant prefix
    pub fn message(&self) -> &str {
        match self {
            Self::Invalid { message }
            | Self::NotFound { message }
            | Self::Transport { message }
            | Self::Cancelled { message }
            | Self::Timeout { message }
            | Self::VersionIncompatible { message }
            | Self::Config { message }
            | Self::Internal { message } => message,
        }
    }

    /// Error code reported in the `error-code` field of an outcome node
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Invalid { .. } | Self::NotFound { .. } => ErrorCode::ClientRejection,
            Self::Transport { .. } => ErrorCode::TransportFailure,
            Self::Cancelled { .. } => ErrorCode::Cancelled,
            Self::Timeout { .. } => ErrorCode::Timeout,
            Self::VersionIncompatible { .. } => ErrorCode::VersionIncompatible,
            Self::Config { .. } | Self::Internal { .. } => ErrorCode::OperationFailed,
        }
    }
}

/// Standard Result type for Helm operations
pub type Result<T> = std::result::Result<T, HelmError>;

impl From<std::io::Error> for HelmError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::not_found(err.to_string()),
            std::io::ErrorKind::TimedOut => Self::timeout(err.to_string()),
            _ => Self::transport(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for HelmError {
    fn from(err: serde_json::Error) -> Self {
        Self::invalid(format!("malformed JSON: {err}"))
    }
}

impl From<toml::de::Error> for HelmError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(err.to_string())
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for HelmError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Self::internal(err.to_string())
    }
}
