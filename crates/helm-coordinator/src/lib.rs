//! # Helm Coordinator - distributed operation execution
//!
//! Executes one logical operation across process boundaries with a
//! two-phase prepare/commit/rollback protocol.
//!
//! ## Architecture
//!
//! - **translator**: coordinator to participant address rewriting
//! - **channel**: the asynchronous participant channel and its listener
//! - **rendezvous**: single-slot handoff between notification tasks and the
//!   waiting caller
//! - **coordinator**: one attempt against one participant
//! - **deadline**: phase deadlines on top of cooperative cancellation
//! - **rollout**: all-or-nothing execution across participants
//! - **controller**: registry ownership and capability journaling
//!
//! ## Ordering
//!
//! Within one attempt, prepared-or-failed strictly precedes completed, and
//! `commit`/`rollback` return only after completion (or cancellation).
//! Across participants no ordering is guaranteed.

#![forbid(unsafe_code)]

pub mod cancel;
pub mod channel;
pub mod controller;
pub mod coordinator;
pub mod deadline;
pub mod messages;
pub mod rendezvous;
pub mod rollout;
pub mod state;
pub mod translator;

pub use cancel::{CancellationSource, CancellationToken, NeverCancel};
pub use channel::{
    AsyncHandle, OperationListener, ParticipantChannel, ParticipantTransaction, PreparedOperation,
};
pub use controller::DomainController;
pub use coordinator::{AttemptOutcome, OperationCoordinator, ProxyTransaction};
pub use deadline::{DeadlineCoordinator, DeadlineToken, DeadlineTransaction};
pub use messages::{
    DiscardingMessageHandler, MessageSeverity, OperationMessageHandler, TracingMessageHandler,
};
pub use rollout::{Rollout, RolloutReport, SERVER_GROUPS};
pub use state::AttemptState;
pub use translator::{
    translate_operation, AddressTranslator, IdentityTranslator, MountPrefixTranslator,
};
