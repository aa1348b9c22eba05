//! # Helm Capability - possible-capability registry
//!
//! Tracks which capabilities resources will provide once present, keyed by
//! canonical capability name, each with the set of resource addresses that
//! declare it.
//!
//! - **capability**: descriptors (legacy vs modeled) and registrations
//! - **registry**: the lock-protected registry owned by one controller
//! - **journal**: per-operation mutation record used to roll the registry back
//!   when the operation does not commit
//!
//! There is no process-wide registry: each controller creates its own and
//! passes it explicitly to the steps that need it.

#![forbid(unsafe_code)]

pub mod capability;
pub mod journal;
pub mod registry;

pub use capability::{Capability, CapabilityKind, CapabilityRegistration};
pub use journal::CapabilityJournal;
pub use registry::CapabilityRegistry;
