//! Deadlines around the two protocol phases
//!
//! The inner coordinator only knows cooperative cancellation. The deadline
//! layer hands it a token that also fires when the phase deadline passes, and
//! turns the resulting `cancelled` outcome into a `failed` one carrying the
//! timeout error code. The prepare deadline wraps
//! [`OperationCoordinator::execute`]; the completion deadline wraps the
//! prepared [`ProxyTransaction`] in a [`DeadlineTransaction`].

use async_trait::async_trait;
use helm_core::config::CoordinatorConfig;
use helm_core::outcome::{self, OutcomeKind};
use helm_core::{HelmError, ModelNode, Operation, OperationId, Result};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

use crate::cancel::CancellationToken;
use crate::coordinator::{AttemptOutcome, OperationCoordinator, ProxyTransaction};
use crate::messages::OperationMessageHandler;
use crate::state::AttemptState;

/// Token firing on its parent's cancellation or when its deadline passes
#[derive(Clone)]
pub struct DeadlineToken {
    parent: Arc<dyn CancellationToken>,
    deadline: Instant,
    timeout: Duration,
}

impl DeadlineToken {
    /// Token expiring `timeout` from now
    pub fn new(parent: Arc<dyn CancellationToken>, timeout: Duration) -> Self {
        Self {
            parent,
            deadline: Instant::now() + timeout,
            timeout,
        }
    }

    /// Configured timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether the deadline, not the parent, caused cancellation
    pub fn expired(&self) -> bool {
        !self.parent.is_cancelled() && Instant::now() >= self.deadline
    }
}

#[async_trait]
impl CancellationToken for DeadlineToken {
    async fn cancelled(&self) {
        tokio::select! {
            () = self.parent.cancelled() => {}
            () = tokio::time::sleep_until(self.deadline) => {}
        }
    }

    fn is_cancelled(&self) -> bool {
        self.parent.is_cancelled() || Instant::now() >= self.deadline
    }
}

/// [`OperationCoordinator`] with per-phase deadlines
#[derive(Debug, Clone)]
pub struct DeadlineCoordinator {
    inner: OperationCoordinator,
    prepare_timeout: Duration,
    completion_timeout: Duration,
}

impl DeadlineCoordinator {
    /// Same `timeout` for both phases
    pub fn new(inner: OperationCoordinator, timeout: Duration) -> Self {
        Self::with_timeouts(inner, timeout, timeout)
    }

    /// Separate prepare and completion timeouts
    pub fn with_timeouts(
        inner: OperationCoordinator,
        prepare_timeout: Duration,
        completion_timeout: Duration,
    ) -> Self {
        Self {
            inner,
            prepare_timeout,
            completion_timeout,
        }
    }

    /// Timeouts from `[coordinator] timeout_ms`
    pub fn from_config(inner: OperationCoordinator, config: &CoordinatorConfig) -> Self {
        Self::new(inner, Duration::from_millis(config.timeout_ms))
    }

    /// Wrapped coordinator
    pub fn inner(&self) -> &OperationCoordinator {
        &self.inner
    }

    /// Participant name
    pub fn participant(&self) -> &str {
        self.inner.participant()
    }

    /// Run the first phase within the prepare deadline.
    ///
    /// A prepared transaction comes back bound to the completion deadline,
    /// measured from the moment the decision is sent.
    pub async fn execute(
        &self,
        operation: Arc<Operation>,
        message_handler: Arc<dyn OperationMessageHandler>,
        cancel: Arc<dyn CancellationToken>,
    ) -> Result<AttemptOutcome<DeadlineTransaction>> {
        let id = operation.id();
        let deadline = Arc::new(DeadlineToken::new(cancel.clone(), self.prepare_timeout));
        let attempt = self
            .inner
            .execute(operation, message_handler, deadline.clone())
            .await?;

        match attempt {
            AttemptOutcome::Failed(result) if is_cancelled(&result) && deadline.expired() => {
                warn!(
                    operation = %id,
                    participant = %self.participant(),
                    timeout_ms = self.prepare_timeout.as_millis() as u64,
                    "Timed out awaiting prepare"
                );
                Ok(AttemptOutcome::Failed(outcome::from_error(&HelmError::timeout(
                    format!(
                        "{id} on {} timed out after {} ms awaiting prepare",
                        self.participant(),
                        self.prepare_timeout.as_millis()
                    ),
                ))))
            }
            AttemptOutcome::Prepared(transaction) => Ok(AttemptOutcome::Prepared(
                DeadlineTransaction {
                    inner: transaction,
                    parent: cancel,
                    timeout: self.completion_timeout,
                },
            )),
            AttemptOutcome::Failed(result) => Ok(AttemptOutcome::Failed(result)),
        }
    }
}

/// Prepared participant whose decision must complete within a deadline.
///
/// The deadline starts when `commit` or `rollback` is called. Dropping an
/// undecided transaction rolls the participant back, as for
/// [`ProxyTransaction`].
pub struct DeadlineTransaction {
    inner: ProxyTransaction,
    parent: Arc<dyn CancellationToken>,
    timeout: Duration,
}

impl fmt::Debug for DeadlineTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeadlineTransaction")
            .field("inner", &self.inner)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl DeadlineTransaction {
    /// Operation id
    pub fn operation_id(&self) -> OperationId {
        self.inner.operation_id()
    }

    /// Participant name
    pub fn participant(&self) -> &str {
        self.inner.participant()
    }

    /// Result reported with the prepared notification
    pub fn prepared_result(&self) -> &ModelNode {
        self.inner.prepared_result()
    }

    /// Attempt state; `None` for operations discarded instead of sent
    pub fn state(&self) -> Option<AttemptState> {
        self.inner.state()
    }

    /// Completion deadline
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Commit and wait for completion within the deadline
    pub async fn commit(self) -> ModelNode {
        self.decide(true).await
    }

    /// Roll back and wait for completion within the deadline
    pub async fn rollback(self) -> ModelNode {
        self.decide(false).await
    }

    async fn decide(self, commit: bool) -> ModelNode {
        let decision = if commit { "commit" } else { "rollback" };
        let Self {
            mut inner,
            parent,
            timeout,
        } = self;
        let id = inner.operation_id();
        let participant = inner.participant().to_string();
        let deadline = Arc::new(DeadlineToken::new(parent, timeout));
        inner.set_cancellation(deadline.clone());

        let result = if commit {
            inner.commit().await
        } else {
            inner.rollback().await
        };
        if !(is_cancelled(&result) && deadline.expired()) {
            return result;
        }

        warn!(
            operation = %id,
            participant = %participant,
            decision = %decision,
            timeout_ms = timeout.as_millis() as u64,
            "Timed out awaiting completion"
        );
        outcome::from_error(&HelmError::timeout(format!(
            "{decision} of {id} on {participant} timed out after {} ms",
            timeout.as_millis()
        )))
    }
}

fn is_cancelled(result: &ModelNode) -> bool {
    outcome::kind_of(result) == Some(OutcomeKind::Cancelled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::{CancellationSource, NeverCancel};

    #[tokio::test(start_paused = true)]
    async fn deadline_fires_and_reports_expiry() {
        let token = DeadlineToken::new(Arc::new(NeverCancel), Duration::from_millis(100));
        assert!(!token.is_cancelled());
        token.cancelled().await;
        assert!(token.is_cancelled());
        assert!(token.expired());
    }

    #[tokio::test(start_paused = true)]
    async fn parent_cancellation_is_not_expiry() {
        let source = CancellationSource::new();
        let token = DeadlineToken::new(source.token(), Duration::from_secs(60));
        source.cancel();
        token.cancelled().await;
        assert!(token.is_cancelled());
        assert!(!token.expired());
    }
}
