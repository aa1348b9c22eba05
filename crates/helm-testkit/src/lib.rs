//! # Helm Testkit
//!
//! Test infrastructure for the coordinator: a scripted in-memory participant
//! channel with an observation log, a recording message handler and small
//! fixtures.

#![forbid(unsafe_code)]

pub mod fixtures;
pub mod messages;
pub mod participant;

pub use fixtures::{address, coordinator_for, coordinator_with_engine, operation, CURRENT_VERSION};
pub use messages::{RecordedMessage, RecordingMessageHandler};
pub use participant::{
    ParticipantEvent, ParticipantScript, PrepareBehavior, SimulatedParticipant, ROLLED_BACK,
};
