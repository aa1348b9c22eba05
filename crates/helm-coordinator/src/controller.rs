//! Controller owning one capability registry and the participants it drives
//!
//! The controller runs an operation's local step against a
//! [`CapabilityJournal`], rolls the operation out to every participant, and
//! commits or reverts the journal to match the rollout's outcome.

use helm_capability::{CapabilityJournal, CapabilityRegistry};
use helm_core::outcome;
use helm_core::{HelmConfig, HelmError, ModelNode, ModelVersion, Operation, Result};
use helm_transform::{
    TransformationContext, TransformationEngine, TransformationTarget, TransformerRegistry,
};
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::cancel::CancellationToken;
use crate::channel::ParticipantChannel;
use crate::coordinator::OperationCoordinator;
use crate::deadline::DeadlineCoordinator;
use crate::messages::OperationMessageHandler;
use crate::rollout::{Rollout, RolloutReport};
use crate::translator::AddressTranslator;

/// Coordinating process state
#[derive(Debug)]
pub struct DomainController {
    config: HelmConfig,
    registry: Arc<CapabilityRegistry>,
    engine: TransformationEngine,
    participants: IndexMap<String, DeadlineCoordinator>,
}

impl DomainController {
    /// Controller with an empty capability registry
    pub fn new(config: HelmConfig, transformers: Arc<TransformerRegistry>) -> Self {
        Self {
            config,
            registry: Arc::new(CapabilityRegistry::new()),
            engine: TransformationEngine::new(transformers),
            participants: IndexMap::new(),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &HelmConfig {
        &self.config
    }

    /// The controller's capability registry
    pub fn capability_registry(&self) -> &Arc<CapabilityRegistry> {
        &self.registry
    }

    /// Transformation engine shared by every participant
    pub fn engine(&self) -> &TransformationEngine {
        &self.engine
    }

    /// Register participant `name` running `version`
    pub fn add_participant(
        &mut self,
        name: impl Into<String>,
        version: ModelVersion,
        channel: Arc<dyn ParticipantChannel>,
        translator: Arc<dyn AddressTranslator>,
    ) -> Result<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(HelmError::invalid("participant name must not be empty"));
        }
        if self.participants.contains_key(&name) {
            return Err(HelmError::invalid(format!(
                "participant '{name}' is already registered"
            )));
        }

        let context = TransformationContext::new(
            TransformationTarget::new(name.clone(), version),
            self.config.transformation.clone(),
        );
        let coordinator =
            OperationCoordinator::new(channel, translator, self.engine.clone(), context);
        debug!(participant = %name, version = %version, "Registered participant");
        self.participants.insert(
            name,
            DeadlineCoordinator::from_config(coordinator, &self.config.coordinator),
        );
        Ok(())
    }

    /// Coordinator for participant `name`
    pub fn participant(&self, name: &str) -> Option<&DeadlineCoordinator> {
        self.participants.get(name)
    }

    /// Registered participant names, in registration order
    pub fn participant_names(&self) -> impl Iterator<Item = &str> {
        self.participants.keys().map(String::as_str)
    }

    /// Rollout over every registered participant
    pub fn rollout(&self) -> Rollout {
        Rollout::from_config(
            self.participants.values().cloned().collect(),
            &self.config.coordinator,
        )
    }

    /// Run `operation`: the local step first, then every participant.
    ///
    /// Capability mutations made by `local_step` through the journal are
    /// kept only if every participant commits successfully.
    pub async fn execute<F>(
        &self,
        operation: Arc<Operation>,
        message_handler: Arc<dyn OperationMessageHandler>,
        cancel: Arc<dyn CancellationToken>,
        local_step: F,
    ) -> Result<ModelNode>
    where
        F: FnOnce(&CapabilityJournal) -> Result<()>,
    {
        let journal = CapabilityJournal::new(self.registry.clone());
        if let Err(error) = local_step(&journal) {
            debug!(operation = %operation, error = %error, "Local step failed");
            journal.rollback();
            return Ok(outcome::from_error(&error));
        }

        // journal rolls back on drop if this returns early
        let report: RolloutReport = self
            .rollout()
            .execute(operation.clone(), message_handler, cancel)
            .await?;

        if report.succeeded() {
            journal.commit();
        } else {
            info!(
                operation = %operation,
                reverted = journal.pending(),
                "Reverting capability changes"
            );
            journal.rollback();
        }
        Ok(report.to_model_node())
    }
}
