//! All-or-nothing execution across several participants
//!
//! Every participant is taken through the first phase, at most
//! `dispatch_concurrency` at a time. Only when every one of them prepared are
//! they all committed; otherwise every prepared participant is rolled back.

use futures::stream::{self, StreamExt};
use helm_core::config::CoordinatorConfig;
use helm_core::outcome::{self, ErrorCode};
use helm_core::{HelmError, ModelNode, Operation, Result};
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cancel::CancellationToken;
use crate::coordinator::AttemptOutcome;
use crate::deadline::{DeadlineCoordinator, DeadlineTransaction};
use crate::messages::OperationMessageHandler;

/// Key of the per-participant map in a composed rollout outcome
pub const SERVER_GROUPS: &str = "server-groups";

/// Per-participant results of one rollout
#[derive(Debug, Clone, PartialEq)]
pub struct RolloutReport {
    operation: String,
    committed: bool,
    outcomes: IndexMap<String, ModelNode>,
}

impl RolloutReport {
    /// Whether every participant prepared and the commit was sent to all
    pub fn committed(&self) -> bool {
        self.committed
    }

    /// Whether every participant committed successfully
    pub fn succeeded(&self) -> bool {
        self.committed && self.outcomes.values().all(outcome::is_success)
    }

    /// Final outcome per participant, in participant order
    pub fn outcomes(&self) -> &IndexMap<String, ModelNode> {
        &self.outcomes
    }

    /// Participants whose final outcome is not a success
    pub fn failed_participants(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, result)| !outcome::is_success(result))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// One outcome node with every participant's result under
    /// [`SERVER_GROUPS`]
    pub fn to_model_node(&self) -> ModelNode {
        let participants: ModelNode = self
            .outcomes
            .iter()
            .map(|(name, result)| (name.clone(), result.clone()))
            .collect();

        let mut node = if self.succeeded() {
            outcome::success(ModelNode::Undefined)
        } else if self.committed {
            outcome::failed(
                format!(
                    "'{}' failed to complete on {:?}",
                    self.operation,
                    self.failed_participants()
                ),
                ErrorCode::OperationFailed,
            )
        } else {
            outcome::failed(
                format!(
                    "'{}' rolled back; not prepared on {:?}",
                    self.operation,
                    self.failed_participants()
                ),
                ErrorCode::OperationFailed,
            )
        };
        node.set(SERVER_GROUPS, participants);
        node
    }
}

/// One operation across many participants
#[derive(Debug, Clone)]
pub struct Rollout {
    participants: Vec<DeadlineCoordinator>,
    concurrency: usize,
}

impl Rollout {
    /// Rollout over `participants`, dispatching at most `concurrency` at once
    pub fn new(participants: Vec<DeadlineCoordinator>, concurrency: usize) -> Self {
        Self {
            participants,
            concurrency: concurrency.max(1),
        }
    }

    /// Concurrency from `[coordinator] dispatch_concurrency`
    pub fn from_config(participants: Vec<DeadlineCoordinator>, config: &CoordinatorConfig) -> Self {
        Self::new(participants, config.dispatch_concurrency)
    }

    /// Participant names in dispatch order
    pub fn participants(&self) -> impl Iterator<Item = &str> {
        self.participants.iter().map(DeadlineCoordinator::participant)
    }

    /// Execute `operation` on every participant.
    ///
    /// A malformed request fails with `Err` after any participant that had
    /// already prepared is rolled back.
    pub async fn execute(
        &self,
        operation: Arc<Operation>,
        message_handler: Arc<dyn OperationMessageHandler>,
        cancel: Arc<dyn CancellationToken>,
    ) -> Result<RolloutReport> {
        debug!(
            operation = %operation,
            participants = self.participants.len(),
            concurrency = self.concurrency,
            "Starting rollout"
        );

        let mut attempts: Vec<(usize, Result<AttemptOutcome<DeadlineTransaction>>)> =
            stream::iter(self.participants.iter().enumerate())
                .map(|(index, participant)| {
                    let operation = operation.clone();
                    let message_handler = message_handler.clone();
                    let cancel = cancel.clone();
                    async move {
                        let attempt = participant.execute(operation, message_handler, cancel).await;
                        (index, attempt)
                    }
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;
        attempts.sort_by_key(|(index, _)| *index);

        let mut setup_error: Option<HelmError> = None;
        let mut prepared: Vec<(usize, DeadlineTransaction)> = Vec::new();
        let mut finished: Vec<(usize, ModelNode)> = Vec::new();
        for (index, attempt) in attempts {
            match attempt {
                Ok(AttemptOutcome::Prepared(transaction)) => prepared.push((index, transaction)),
                Ok(AttemptOutcome::Failed(result)) => finished.push((index, result)),
                Err(error) => {
                    setup_error.get_or_insert(error);
                }
            }
        }

        let commit = setup_error.is_none() && finished.is_empty();
        if commit {
            debug!(operation = %operation, "Every participant prepared; committing");
        } else {
            warn!(
                operation = %operation,
                prepared = prepared.len(),
                failed = finished.len(),
                "Not every participant prepared; rolling back"
            );
        }
        let decided = futures::future::join_all(prepared.into_iter().map(
            |(index, transaction)| async move {
                let result = if commit {
                    transaction.commit().await
                } else {
                    transaction.rollback().await
                };
                (index, result)
            },
        ))
        .await;

        if let Some(error) = setup_error {
            return Err(error);
        }

        finished.extend(decided);
        finished.sort_by_key(|(index, _)| *index);
        let outcomes = finished
            .into_iter()
            .map(|(index, result)| (self.participants[index].participant().to_string(), result))
            .collect();

        let report = RolloutReport {
            operation: operation.name().to_string(),
            committed: commit,
            outcomes,
        };
        info!(
            operation = %operation,
            committed = report.committed(),
            succeeded = report.succeeded(),
            "Rollout finished"
        );
        Ok(report)
    }
}
