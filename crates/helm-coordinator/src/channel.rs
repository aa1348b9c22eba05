//! Participant channel contract
//!
//! A channel dispatches an operation to one participant and reports back
//! through an [`OperationListener`]: exactly one of `prepared` or `failed`,
//! then, after a prepared participant receives its decision, `completed`.
//! Notifications arrive on tasks owned by the channel.

use async_trait::async_trait;
use helm_core::{AttachmentRef, ModelNode, Operation, Result};
use std::fmt;
use std::sync::Arc;

use crate::messages::OperationMessageHandler;

/// Second-phase decision sink held by a prepared participant.
///
/// Both methods only send the decision; completion is reported separately
/// through [`OperationListener::operation_completed`].
pub trait ParticipantTransaction: Send {
    /// Make the prepared changes durable
    fn commit(self: Box<Self>);

    /// Discard the prepared changes
    fn rollback(self: Box<Self>);
}

/// Payload of a `prepared` notification
pub struct PreparedOperation {
    result: ModelNode,
    transaction: Box<dyn ParticipantTransaction>,
}

impl PreparedOperation {
    /// Prepared notification carrying `result` and the decision sink
    pub fn new(result: ModelNode, transaction: Box<dyn ParticipantTransaction>) -> Self {
        Self {
            result,
            transaction,
        }
    }

    /// Prepared result, as reported by the participant
    pub fn result(&self) -> &ModelNode {
        &self.result
    }

    /// Split into result and decision sink
    pub fn into_parts(self) -> (ModelNode, Box<dyn ParticipantTransaction>) {
        (self.result, self.transaction)
    }
}

impl fmt::Debug for PreparedOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreparedOperation")
            .field("result", &self.result)
            .finish_non_exhaustive()
    }
}

/// Receiver of the three attempt notifications
pub trait OperationListener: Send + Sync {
    /// Participant prepared
    fn operation_prepared(&self, prepared: PreparedOperation);

    /// Participant failed before preparing
    fn operation_failed(&self, result: ModelNode);

    /// Participant applied the decision
    fn operation_completed(&self, result: ModelNode);
}

/// Handle on an in-flight remote call
pub struct AsyncHandle {
    canceller: Option<Box<dyn FnOnce() + Send>>,
}

impl AsyncHandle {
    /// Handle that runs `canceller` when cancelled
    pub fn new(canceller: impl FnOnce() + Send + 'static) -> Self {
        Self {
            canceller: Some(Box::new(canceller)),
        }
    }

    /// Handle for a call that cannot be cancelled
    pub fn detached() -> Self {
        Self { canceller: None }
    }

    /// Best-effort cancel; returns whether a cancel request was issued
    pub fn cancel(&mut self) -> bool {
        match self.canceller.take() {
            Some(canceller) => {
                canceller();
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for AsyncHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncHandle")
            .field("cancellable", &self.canceller.is_some())
            .finish()
    }
}

/// Asynchronous channel to one participant
#[async_trait]
pub trait ParticipantChannel: Send + Sync {
    /// Dispatch `operation`.
    ///
    /// Returns once the request is on its way; an `Err` means it never left
    /// and no notification will follow.
    async fn execute(
        &self,
        listener: Arc<dyn OperationListener>,
        operation: Arc<Operation>,
        message_handler: Arc<dyn OperationMessageHandler>,
        attachments: Vec<AttachmentRef>,
    ) -> Result<AsyncHandle>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn handle_cancels_once() {
        let cancelled = Arc::new(AtomicBool::new(false));
        let mut handle = AsyncHandle::new({
            let cancelled = cancelled.clone();
            move || cancelled.store(true, Ordering::SeqCst)
        });
        assert!(handle.cancel());
        assert!(!handle.cancel());
        assert!(cancelled.load(Ordering::SeqCst));
        assert!(!AsyncHandle::detached().cancel());
    }
}
