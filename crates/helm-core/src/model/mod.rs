//! Structured value model
//!
//! [`ModelNode`] is the universal payload for operations, results and
//! capability metadata.

mod json;
mod node;

pub use node::{ModelNode, ModelType};
