//! Per-operation messages reported while an operation executes.

use helm_core::OperationId;
use std::fmt;
use tracing::{debug, error, info, warn};

/// Message severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MessageSeverity {
    /// Informational
    Info,
    /// Something the operation's caller should know about
    Warning,
    /// Failure detail
    Error,
}

impl fmt::Display for MessageSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Info => "INFO",
            Self::Warning => "WARN",
            Self::Error => "ERROR",
        };
        f.write_str(text)
    }
}

/// Receives messages about one operation
pub trait OperationMessageHandler: fmt::Debug + Send + Sync {
    /// Handle `message` about `operation`
    fn handle_report(&self, operation: OperationId, severity: MessageSeverity, message: &str);
}

/// Routes messages to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingMessageHandler;

impl OperationMessageHandler for TracingMessageHandler {
    fn handle_report(&self, operation: OperationId, severity: MessageSeverity, message: &str) {
        match severity {
            MessageSeverity::Info => info!(operation = %operation, "{message}"),
            MessageSeverity::Warning => warn!(operation = %operation, "{message}"),
            MessageSeverity::Error => error!(operation = %operation, "{message}"),
        }
    }
}

/// Drops every message
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardingMessageHandler;

impl OperationMessageHandler for DiscardingMessageHandler {
    fn handle_report(&self, operation: OperationId, severity: MessageSeverity, message: &str) {
        debug!(operation = %operation, severity = %severity, "Discarded operation message: {message}");
    }
}
