//! Helm Core - management value model foundation
//!
//! Types shared by every layer of the management kernel:
//!
//! - [`ModelNode`]: the dynamically typed value tree carried by operations,
//!   results and capability metadata
//! - [`PathAddress`]: ordered `key=value` resource addresses with wildcards
//! - [`Operation`]: immutable operation descriptors
//! - [`outcome`]: `success` / `failed` / `cancelled` result encoding
//! - [`ModelVersion`]: participant management-model versions
//! - [`HelmError`]: the unified error type
//! - [`config`]: layered TOML / environment configuration

#![forbid(unsafe_code)]

/// Resource addresses
pub mod address;

/// Layered configuration
pub mod config;

/// Unified error handling
pub mod errors;

/// Structured value tree
pub mod model;

/// Operation descriptors
pub mod operation;

/// Outcome encoding
pub mod outcome;

/// Model versions
pub mod version;

pub use address::{PathAddress, PathElement, WILDCARD};
pub use config::HelmConfig;
pub use errors::{HelmError, Result};
pub use model::{ModelNode, ModelType};
pub use operation::{AttachmentRef, Operation, OperationId};
pub use outcome::{ErrorCode, OutcomeKind};
pub use version::ModelVersion;
