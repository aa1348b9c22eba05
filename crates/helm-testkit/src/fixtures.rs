//! Common fixtures for coordinator tests.

use helm_coordinator::{IdentityTranslator, OperationCoordinator};
use helm_core::{ModelVersion, Operation, PathAddress};
use helm_transform::{TransformationContext, TransformationEngine, TransformationTarget};
use std::sync::Arc;

use crate::participant::SimulatedParticipant;

/// Version of a participant running the current model
pub const CURRENT_VERSION: ModelVersion = ModelVersion::new(2, 0, 0);

/// Parse `text` as an address
///
/// # Panics
///
/// Panics if `text` is not a valid address.
#[allow(clippy::expect_used)]
pub fn address(text: &str) -> PathAddress {
    text.parse().expect("valid test address")
}

/// Shared `name` operation at `address`
///
/// # Panics
///
/// Panics if `name` is empty or `address` is invalid.
#[allow(clippy::expect_used)]
pub fn operation(name: &str, address_text: &str) -> Arc<Operation> {
    Arc::new(Operation::new(name, address(address_text)).expect("valid test operation"))
}

/// Coordinator for `participant` at `version`, with no translation and no
/// registered transformations
pub fn coordinator_for(participant: &SimulatedParticipant, version: ModelVersion) -> OperationCoordinator {
    coordinator_with_engine(participant, version, TransformationEngine::default())
}

/// Coordinator for `participant` at `version` using `engine`
pub fn coordinator_with_engine(
    participant: &SimulatedParticipant,
    version: ModelVersion,
    engine: TransformationEngine,
) -> OperationCoordinator {
    OperationCoordinator::new(
        Arc::new(participant.clone()),
        Arc::new(IdentityTranslator),
        engine,
        TransformationContext::for_target(TransformationTarget::new(participant.name(), version)),
    )
}
