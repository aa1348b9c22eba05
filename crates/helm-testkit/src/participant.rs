//! Scripted in-memory participant
//!
//! [`SimulatedParticipant`] implements [`ParticipantChannel`] without any
//! transport: each dispatched operation runs on its own tokio task that
//! follows a [`ParticipantScript`] and records what happened in an
//! observation log.

use async_trait::async_trait;
use helm_coordinator::{
    AsyncHandle, MessageSeverity, OperationListener, OperationMessageHandler, ParticipantChannel,
    ParticipantTransaction, PreparedOperation,
};
use helm_core::outcome::{self, ErrorCode};
use helm_core::{AttachmentRef, HelmError, ModelNode, Operation, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::debug;

/// Key set on the completed result of a rolled-back participant
pub const ROLLED_BACK: &str = "rolled-back";

/// What the participant does with a dispatched operation
#[derive(Debug, Clone, PartialEq)]
pub enum PrepareBehavior {
    /// Prepare, then apply whatever decision arrives
    Prepare,
    /// Report `failed` with this result
    Fail(ModelNode),
    /// Refuse the dispatch itself
    TransportError(String),
    /// Never send any notification
    Silent,
    /// Drop the listener without notifying
    CloseChannel,
}

/// Timing and behaviour of a [`SimulatedParticipant`]
#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantScript {
    prepare_delay: Duration,
    completion_delay: Duration,
    behavior: PrepareBehavior,
    duplicate_prepared: bool,
    result: ModelNode,
}

impl Default for ParticipantScript {
    fn default() -> Self {
        Self {
            prepare_delay: Duration::ZERO,
            completion_delay: Duration::ZERO,
            behavior: PrepareBehavior::Prepare,
            duplicate_prepared: false,
            result: ModelNode::Undefined,
        }
    }
}

impl ParticipantScript {
    /// Prepare immediately and complete immediately
    pub fn prepare() -> Self {
        Self::default()
    }

    /// Fail with `description`
    pub fn fail(description: impl Into<String>) -> Self {
        Self {
            behavior: PrepareBehavior::Fail(outcome::failed(
                description,
                ErrorCode::OperationFailed,
            )),
            ..Self::default()
        }
    }

    /// Refuse dispatch with a transport error
    pub fn transport_error(message: impl Into<String>) -> Self {
        Self {
            behavior: PrepareBehavior::TransportError(message.into()),
            ..Self::default()
        }
    }

    /// Never answer
    pub fn silent() -> Self {
        Self {
            behavior: PrepareBehavior::Silent,
            ..Self::default()
        }
    }

    /// Close the channel without answering
    pub fn close_channel() -> Self {
        Self {
            behavior: PrepareBehavior::CloseChannel,
            ..Self::default()
        }
    }

    /// Wait `delay` before the first notification
    pub fn with_prepare_delay(mut self, delay: Duration) -> Self {
        self.prepare_delay = delay;
        self
    }

    /// Wait `delay` between receiving the decision and completing
    pub fn with_completion_delay(mut self, delay: Duration) -> Self {
        self.completion_delay = delay;
        self
    }

    /// Send a second `prepared` notification right after the first
    pub fn with_duplicate_prepared(mut self) -> Self {
        self.duplicate_prepared = true;
        self
    }

    /// Result reported when prepared and after commit
    pub fn with_result(mut self, result: impl Into<ModelNode>) -> Self {
        self.result = result.into();
        self
    }

    /// Behaviour on dispatch
    pub fn behavior(&self) -> &PrepareBehavior {
        &self.behavior
    }
}

/// Entry in a participant's observation log
#[derive(Debug, Clone, PartialEq)]
pub enum ParticipantEvent {
    /// Operation dispatched to this participant
    Received(Arc<Operation>),
    /// Dispatch refused
    TransportError,
    /// `prepared` sent
    Prepared,
    /// Second `prepared` sent
    DuplicatePrepared,
    /// `failed` sent
    Failed,
    /// Commit decision applied
    Committed,
    /// Rollback decision applied, or no decision before the transaction was dropped
    RolledBack,
    /// Commit received through the duplicate notification's transaction
    DuplicateCommitted,
    /// Rollback received through the duplicate notification's transaction
    DuplicateRolledBack,
    /// `completed` sent
    Completed,
    /// Remote call cancelled
    Cancelled,
    /// Listener dropped without notifying
    Closed,
}

type EventLog = Arc<Mutex<Vec<ParticipantEvent>>>;

/// In-memory participant following a [`ParticipantScript`]
#[derive(Debug, Clone)]
pub struct SimulatedParticipant {
    name: String,
    script: ParticipantScript,
    log: EventLog,
}

impl SimulatedParticipant {
    /// Participant `name` following `script`
    pub fn new(name: impl Into<String>, script: ParticipantScript) -> Self {
        Self {
            name: name.into(),
            script,
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Participant name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Everything observed so far, in order
    pub fn events(&self) -> Vec<ParticipantEvent> {
        self.log.lock().clone()
    }

    /// Whether `event` was observed
    pub fn observed(&self, event: &ParticipantEvent) -> bool {
        self.log.lock().contains(event)
    }

    /// Operations dispatched to this participant
    pub fn received(&self) -> Vec<Arc<Operation>> {
        self.log
            .lock()
            .iter()
            .filter_map(|event| match event {
                ParticipantEvent::Received(operation) => Some(operation.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ParticipantChannel for SimulatedParticipant {
    async fn execute(
        &self,
        listener: Arc<dyn OperationListener>,
        operation: Arc<Operation>,
        message_handler: Arc<dyn OperationMessageHandler>,
        attachments: Vec<AttachmentRef>,
    ) -> Result<AsyncHandle> {
        record(&self.log, ParticipantEvent::Received(operation.clone()));
        message_handler.handle_report(
            operation.id(),
            MessageSeverity::Info,
            &format!(
                "{} received {operation} with {} attachment(s)",
                self.name,
                attachments.len()
            ),
        );

        if let PrepareBehavior::TransportError(message) = &self.script.behavior {
            record(&self.log, ParticipantEvent::TransportError);
            return Err(HelmError::transport(format!("{}: {message}", self.name)));
        }

        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        tokio::spawn(run_script(
            self.name.clone(),
            self.script.clone(),
            listener,
            self.log.clone(),
            cancel_rx,
        ));
        Ok(AsyncHandle::new(move || {
            let _ = cancel_tx.send(());
        }))
    }
}

fn record(log: &EventLog, event: ParticipantEvent) {
    log.lock().push(event);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Commit,
    Rollback,
}

struct SimulatedTransaction {
    decision_tx: oneshot::Sender<Decision>,
}

impl ParticipantTransaction for SimulatedTransaction {
    fn commit(self: Box<Self>) {
        let _ = self.decision_tx.send(Decision::Commit);
    }

    fn rollback(self: Box<Self>) {
        let _ = self.decision_tx.send(Decision::Rollback);
    }
}

struct DuplicateTransaction {
    log: EventLog,
}

impl ParticipantTransaction for DuplicateTransaction {
    fn commit(self: Box<Self>) {
        record(&self.log, ParticipantEvent::DuplicateCommitted);
    }

    fn rollback(self: Box<Self>) {
        record(&self.log, ParticipantEvent::DuplicateRolledBack);
    }
}

/// Cancellation side of an [`AsyncHandle`]; a dropped handle never cancels
struct CancelSignal {
    cancel_rx: Option<oneshot::Receiver<()>>,
}

impl CancelSignal {
    /// `true` once cancelled, `false` once the handle is dropped
    async fn wait(&mut self) -> bool {
        let Some(cancel_rx) = self.cancel_rx.as_mut() else {
            return false;
        };
        let cancelled = cancel_rx.await.is_ok();
        self.cancel_rx = None;
        cancelled
    }

    /// Resolves only on cancellation
    async fn cancelled(&mut self) {
        if !self.wait().await {
            std::future::pending::<()>().await;
        }
    }
}

async fn run_script(
    name: String,
    script: ParticipantScript,
    listener: Arc<dyn OperationListener>,
    log: EventLog,
    cancel_rx: oneshot::Receiver<()>,
) {
    let mut cancel = CancelSignal {
        cancel_rx: Some(cancel_rx),
    };

    tokio::select! {
        () = cancel.cancelled() => {
            record(&log, ParticipantEvent::Cancelled);
            return;
        }
        () = tokio::time::sleep(script.prepare_delay) => {}
    }

    match script.behavior {
        PrepareBehavior::Prepare => {}
        PrepareBehavior::Fail(result) => {
            record(&log, ParticipantEvent::Failed);
            listener.operation_failed(result);
            return;
        }
        PrepareBehavior::Silent => {
            if cancel.wait().await {
                record(&log, ParticipantEvent::Cancelled);
            }
            return;
        }
        PrepareBehavior::CloseChannel => {
            record(&log, ParticipantEvent::Closed);
            return;
        }
        PrepareBehavior::TransportError(_) => return,
    }

    let (decision_tx, decision_rx) = oneshot::channel();
    record(&log, ParticipantEvent::Prepared);
    listener.operation_prepared(PreparedOperation::new(
        outcome::success(script.result.clone()),
        Box::new(SimulatedTransaction { decision_tx }),
    ));
    if script.duplicate_prepared {
        record(&log, ParticipantEvent::DuplicatePrepared);
        listener.operation_prepared(PreparedOperation::new(
            outcome::success(script.result.clone()),
            Box::new(DuplicateTransaction { log: log.clone() }),
        ));
    }

    let decision = tokio::select! {
        () = cancel.cancelled() => {
            record(&log, ParticipantEvent::Cancelled);
            return;
        }
        decision = decision_rx => decision.unwrap_or(Decision::Rollback),
    };
    record(
        &log,
        match decision {
            Decision::Commit => ParticipantEvent::Committed,
            Decision::Rollback => ParticipantEvent::RolledBack,
        },
    );
    debug!(participant = %name, decision = ?decision, "Simulated participant decided");

    tokio::select! {
        () = cancel.cancelled() => {
            record(&log, ParticipantEvent::Cancelled);
            return;
        }
        () = tokio::time::sleep(script.completion_delay) => {}
    }

    let result = match decision {
        Decision::Commit => outcome::success(script.result),
        Decision::Rollback => outcome::failed(
            format!("{name} rolled back the operation"),
            ErrorCode::OperationFailed,
        )
        .with(ROLLED_BACK, true),
    };
    record(&log, ParticipantEvent::Completed);
    listener.operation_completed(result);
}
