//! Message handler that keeps what it receives.

use helm_coordinator::{MessageSeverity, OperationMessageHandler};
use helm_core::OperationId;
use parking_lot::Mutex;

/// One recorded message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedMessage {
    /// Operation the message is about
    pub operation: OperationId,
    /// Severity
    pub severity: MessageSeverity,
    /// Text
    pub message: String,
}

/// Collects every message for later assertions
#[derive(Debug, Default)]
pub struct RecordingMessageHandler {
    messages: Mutex<Vec<RecordedMessage>>,
}

impl RecordingMessageHandler {
    /// Empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far
    pub fn messages(&self) -> Vec<RecordedMessage> {
        self.messages.lock().clone()
    }

    /// Texts recorded at `severity`
    pub fn with_severity(&self, severity: MessageSeverity) -> Vec<String> {
        self.messages
            .lock()
            .iter()
            .filter(|recorded| recorded.severity == severity)
            .map(|recorded| recorded.message.clone())
            .collect()
    }
}

impl OperationMessageHandler for RecordingMessageHandler {
    fn handle_report(&self, operation: OperationId, severity: MessageSeverity, message: &str) {
        self.messages.lock().push(RecordedMessage {
            operation,
            severity,
            message: message.to_string(),
        });
    }
}
