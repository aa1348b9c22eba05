//! # Helm Transform - rolling-upgrade compatibility
//!
//! Adapts operations, replies and resource models so a coordinator can drive
//! participants running older model versions.
//!
//! - **checker**: per-attribute rejection rules
//! - **accumulator**: rejections grouped by checker id for one pass
//! - **description**: per-resource discard, reject and rename rules
//! - **registry**: descriptions by address pattern and model version
//! - **engine**: operation and resource-model transformation
//! - **result**: reply adaptation, including `read-attribute-description`
//!   emulation for targets that only know `read-resource-description`

#![forbid(unsafe_code)]

pub mod accumulator;
pub mod checker;
pub mod context;
pub mod description;
pub mod engine;
pub mod registry;
pub mod result;

pub use accumulator::{RejectionAccumulator, RejectionGroup};
pub use checker::{RejectAttributeChecker, RejectPredicate};
pub use context::{TransformationContext, TransformationTarget};
pub use description::{DiscardPolicy, ResourceTransformationDescription};
pub use engine::{OperationTransformation, ResourceTransformation, TransformationEngine};
pub use registry::TransformerRegistry;
pub use result::{
    AttributeDescriptionTransformer, DiscardedResultTransformer, IdentityResultTransformer,
    OperationResultTransformer,
};
