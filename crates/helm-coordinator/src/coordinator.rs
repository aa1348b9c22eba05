//! Two-phase execution of one operation against one participant
//!
//! [`OperationCoordinator::execute`] translates and transforms the operation,
//! dispatches it, and waits on a single-slot rendezvous for the participant's
//! first notification. A failure is returned as-is; a prepared participant is
//! returned as a [`ProxyTransaction`] whose `commit` or `rollback` sends the
//! decision and then waits on a second rendezvous for completion.
//!
//! The coordinator has no timeouts of its own; see
//! [`DeadlineCoordinator`](crate::deadline::DeadlineCoordinator).

use helm_core::outcome::{self, ErrorCode};
use helm_core::{HelmError, ModelNode, Operation, OperationId, Result};
use helm_transform::{OperationResultTransformer, TransformationContext, TransformationEngine};
use std::fmt;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::cancel::CancellationToken;
use crate::channel::{
    AsyncHandle, OperationListener, ParticipantChannel, ParticipantTransaction, PreparedOperation,
};
use crate::messages::{MessageSeverity, OperationMessageHandler};
use crate::rendezvous::{rendezvous, RendezvousSlot};
use crate::state::{AttemptState, AttemptTracker};
use crate::translator::{translate_operation, AddressTranslator};

/// First notification of an attempt
enum PrepareSignal {
    Prepared(PreparedOperation),
    Failed(ModelNode),
}

/// Listener handed to the channel for one attempt
struct AttemptListener {
    operation: OperationId,
    participant: String,
    prepare_slot: RendezvousSlot<PrepareSignal>,
    completion_slot: RendezvousSlot<ModelNode>,
}

impl OperationListener for AttemptListener {
    fn operation_prepared(&self, prepared: PreparedOperation) {
        let Err(rejected) = self.prepare_slot.offer(PrepareSignal::Prepared(prepared)) else {
            return;
        };
        if let PrepareSignal::Prepared(prepared) = rejected {
            warn!(
                operation = %self.operation,
                participant = %self.participant,
                "Prepared notification arrived with no one waiting; rolling it back"
            );
            let (_, transaction) = prepared.into_parts();
            transaction.rollback();
        }
    }

    fn operation_failed(&self, result: ModelNode) {
        if self.prepare_slot.offer(PrepareSignal::Failed(result)).is_err() {
            warn!(
                operation = %self.operation,
                participant = %self.participant,
                "Ignoring failed notification with no one waiting"
            );
        }
    }

    fn operation_completed(&self, result: ModelNode) {
        if self.completion_slot.offer(result).is_err() {
            debug!(
                operation = %self.operation,
                participant = %self.participant,
                "Ignoring completed notification with no one waiting"
            );
        }
    }
}

/// Result of the first phase, generic over the prepared handle so that
/// wrapping layers can hand out their own transaction type
#[derive(Debug)]
pub enum AttemptOutcome<T = ProxyTransaction> {
    /// Participant prepared; the caller must decide
    Prepared(T),
    /// Participant failed, or the attempt was cancelled or never sent.
    /// Carries a `failed` or `cancelled` outcome node.
    Failed(ModelNode),
}

impl<T> AttemptOutcome<T> {
    /// Whether the participant prepared
    pub fn is_prepared(&self) -> bool {
        matches!(self, Self::Prepared(_))
    }
}

/// Drives operations against one participant
#[derive(Clone)]
pub struct OperationCoordinator {
    channel: Arc<dyn ParticipantChannel>,
    translator: Arc<dyn AddressTranslator>,
    engine: TransformationEngine,
    context: TransformationContext,
}

impl fmt::Debug for OperationCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationCoordinator")
            .field("target", self.context.target())
            .field("translator", &self.translator)
            .finish_non_exhaustive()
    }
}

impl OperationCoordinator {
    /// Coordinator for the participant described by `context`
    pub fn new(
        channel: Arc<dyn ParticipantChannel>,
        translator: Arc<dyn AddressTranslator>,
        engine: TransformationEngine,
        context: TransformationContext,
    ) -> Self {
        Self {
            channel,
            translator,
            engine,
            context,
        }
    }

    /// Participant name
    pub fn participant(&self) -> &str {
        self.context.target().name()
    }

    /// Transformation context for the participant
    pub fn context(&self) -> &TransformationContext {
        &self.context
    }

    /// Run the first phase of `operation`.
    ///
    /// Only malformed requests fail with `Err`, before anything is sent.
    /// Transport errors, version incompatibilities and cancellation are
    /// reported as [`AttemptOutcome::Failed`].
    pub async fn execute(
        &self,
        operation: Arc<Operation>,
        message_handler: Arc<dyn OperationMessageHandler>,
        cancel: Arc<dyn CancellationToken>,
    ) -> Result<AttemptOutcome> {
        let id = operation.id();
        let participant = self.participant().to_string();
        let operation = translate_operation(self.translator.as_ref(), operation);

        let transformation = match self.engine.transform_operation(
            &self.context,
            operation.address(),
            operation.clone(),
        ) {
            Ok(transformation) => transformation,
            Err(error @ HelmError::Invalid { .. }) => return Err(error),
            Err(error) => {
                debug!(operation = %id, participant = %participant, error = %error, "Transformation failed");
                message_handler.handle_report(id, MessageSeverity::Error, error.message());
                return Ok(AttemptOutcome::Failed(outcome::from_error(&error)));
            }
        };
        if let Some(warning) = &transformation.warning {
            message_handler.handle_report(id, MessageSeverity::Warning, warning);
        }
        if transformation.discarded {
            debug!(operation = %id, participant = %participant, "Operation discarded for participant");
            let result = transformation.transform_result(ModelNode::Undefined);
            return Ok(AttemptOutcome::Prepared(ProxyTransaction::discarded(
                id,
                participant,
                result,
            )));
        }

        let tracker = AttemptTracker::new();
        let (prepare_slot, mut prepare_rx) = rendezvous();
        let (completion_slot, completion_rx) = rendezvous();
        let listener: Arc<dyn OperationListener> = Arc::new(AttemptListener {
            operation: id,
            participant: participant.clone(),
            prepare_slot,
            completion_slot,
        });
        let attachments = transformation.operation.attachments().to_vec();

        let dispatched = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                release_unclaimed(&mut prepare_rx, id, &participant);
                tracker.advance(AttemptState::Failed);
                debug!(operation = %id, participant = %participant, "Cancelled before dispatch");
                return Ok(AttemptOutcome::Failed(cancelled_outcome(id, &participant)));
            }
            dispatched = self.channel.execute(
                listener,
                transformation.operation.clone(),
                message_handler.clone(),
                attachments,
            ) => dispatched,
        };
        let mut handle = match dispatched {
            Ok(handle) => handle,
            Err(error) => {
                release_unclaimed(&mut prepare_rx, id, &participant);
                tracker.advance(AttemptState::Failed);
                warn!(operation = %id, participant = %participant, error = %error, "Dispatch failed");
                return Ok(AttemptOutcome::Failed(outcome::failed(
                    error.message(),
                    ErrorCode::TransportFailure,
                )));
            }
        };
        debug!(operation = %id, participant = %participant, "Dispatched; awaiting prepare");

        let signal = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                handle.cancel();
                release_unclaimed(&mut prepare_rx, id, &participant);
                tracker.advance(AttemptState::Failed);
                debug!(operation = %id, participant = %participant, "Cancelled while awaiting prepare");
                return Ok(AttemptOutcome::Failed(cancelled_outcome(id, &participant)));
            }
            signal = &mut prepare_rx => signal,
        };

        match signal {
            Ok(PrepareSignal::Prepared(prepared)) => {
                tracker.advance(AttemptState::Prepared);
                debug!(operation = %id, participant = %participant, "Participant prepared");
                let (result, transaction) = prepared.into_parts();
                let mut prepared_result = transformation.transform_result(result);
                if let Some(warning) = &transformation.warning {
                    outcome::add_warning(&mut prepared_result, warning.clone());
                }
                Ok(AttemptOutcome::Prepared(ProxyTransaction {
                    operation: id,
                    participant,
                    prepared_result,
                    warning: transformation.warning,
                    pending: Some(PendingDecision {
                        transaction,
                        completion: completion_rx,
                        handle,
                        tracker,
                        result_transformer: transformation.result_transformer,
                        cancel,
                    }),
                }))
            }
            Ok(PrepareSignal::Failed(result)) => {
                tracker.advance(AttemptState::Failed);
                debug!(operation = %id, participant = %participant, "Participant failed");
                Ok(AttemptOutcome::Failed(transformation.transform_result(result)))
            }
            Err(_) => {
                tracker.advance(AttemptState::Failed);
                warn!(operation = %id, participant = %participant, "Channel closed before prepare");
                Ok(AttemptOutcome::Failed(outcome::failed(
                    format!("{participant} closed the channel before preparing {id}"),
                    ErrorCode::TransportFailure,
                )))
            }
        }
    }
}

/// Close the prepare slot and roll back a `prepared` that arrived after the
/// attempt was abandoned but before anyone read it. Later notifications find
/// the slot closed and are rolled back by the listener.
fn release_unclaimed(
    prepare_rx: &mut oneshot::Receiver<PrepareSignal>,
    id: OperationId,
    participant: &str,
) {
    prepare_rx.close();
    if let Ok(PrepareSignal::Prepared(prepared)) = prepare_rx.try_recv() {
        warn!(
            operation = %id,
            participant = %participant,
            "Participant prepared an abandoned attempt; rolling it back"
        );
        let (_, transaction) = prepared.into_parts();
        transaction.rollback();
    }
}

fn cancelled_outcome(id: OperationId, participant: &str) -> ModelNode {
    outcome::cancelled(format!("{id} on {participant} was cancelled"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Commit,
    Rollback,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Commit => "commit",
            Self::Rollback => "rollback",
        })
    }
}

struct PendingDecision {
    transaction: Box<dyn ParticipantTransaction>,
    completion: oneshot::Receiver<ModelNode>,
    handle: AsyncHandle,
    tracker: AttemptTracker,
    result_transformer: Arc<dyn OperationResultTransformer>,
    cancel: Arc<dyn CancellationToken>,
}

/// Prepared participant awaiting the caller's decision.
///
/// `commit` and `rollback` consume the handle, so each attempt is decided at
/// most once. Dropping an undecided handle rolls the participant back
/// without waiting for completion.
pub struct ProxyTransaction {
    operation: OperationId,
    participant: String,
    prepared_result: ModelNode,
    warning: Option<String>,
    pending: Option<PendingDecision>,
}

impl fmt::Debug for ProxyTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyTransaction")
            .field("operation", &self.operation)
            .field("participant", &self.participant)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl ProxyTransaction {
    fn discarded(operation: OperationId, participant: String, result: ModelNode) -> Self {
        Self {
            operation,
            participant,
            prepared_result: result,
            warning: None,
            pending: None,
        }
    }

    /// Operation id
    pub fn operation_id(&self) -> OperationId {
        self.operation
    }

    /// Participant name
    pub fn participant(&self) -> &str {
        &self.participant
    }

    /// Result reported with the prepared notification
    pub fn prepared_result(&self) -> &ModelNode {
        &self.prepared_result
    }

    /// Attempt state; `None` for operations discarded instead of sent
    pub fn state(&self) -> Option<AttemptState> {
        self.pending.as_ref().map(|pending| pending.tracker.get())
    }

    /// Replace the token observed while awaiting completion
    pub fn set_cancellation(&mut self, cancel: Arc<dyn CancellationToken>) {
        if let Some(pending) = self.pending.as_mut() {
            pending.cancel = cancel;
        }
    }

    /// Commit and wait for the participant to complete
    pub async fn commit(mut self) -> ModelNode {
        self.decide(Decision::Commit).await
    }

    /// Roll back and wait for the participant to complete
    pub async fn rollback(mut self) -> ModelNode {
        self.decide(Decision::Rollback).await
    }

    async fn decide(&mut self, decision: Decision) -> ModelNode {
        let Some(pending) = self.pending.take() else {
            return self.prepared_result.clone();
        };
        let PendingDecision {
            transaction,
            completion,
            mut handle,
            tracker,
            result_transformer,
            cancel,
        } = pending;

        match decision {
            Decision::Commit => {
                tracker.advance(AttemptState::Committed);
                transaction.commit();
            }
            Decision::Rollback => {
                tracker.advance(AttemptState::RolledBack);
                transaction.rollback();
            }
        }
        debug!(
            operation = %self.operation,
            participant = %self.participant,
            decision = %decision,
            "Decision sent; awaiting completion"
        );

        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                handle.cancel();
                debug!(
                    operation = %self.operation,
                    participant = %self.participant,
                    decision = %decision,
                    "Cancelled while awaiting completion"
                );
                outcome::cancelled(format!(
                    "{decision} of {} on {} was cancelled",
                    self.operation, self.participant
                ))
            }
            completed = completion => match completed {
                Ok(result) => {
                    let mut result = result_transformer.transform_result(result);
                    if let Some(warning) = self.warning.take() {
                        outcome::add_warning(&mut result, warning);
                    }
                    result
                }
                Err(_) => {
                    warn!(
                        operation = %self.operation,
                        participant = %self.participant,
                        "Channel closed before completion"
                    );
                    outcome::failed(
                        format!(
                            "{} closed the channel before completing {}",
                            self.participant, self.operation
                        ),
                        ErrorCode::TransportFailure,
                    )
                }
            },
        }
    }
}

impl Drop for ProxyTransaction {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            warn!(
                operation = %self.operation,
                participant = %self.participant,
                "Transaction dropped without a decision; rolling back"
            );
            pending.tracker.advance(AttemptState::RolledBack);
            pending.transaction.rollback();
        }
    }
}
