//! Outcome encoding
//!
//! Every result travelling between coordinator and participants is a
//! [`ModelNode`] carrying an `outcome` field. Failed and cancelled outcomes
//! also carry `failure-description` and `error-code`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::HelmError;
use crate::model::ModelNode;

/// `outcome` field name
pub const OUTCOME: &str = "outcome";
/// `result` field name
pub const RESULT: &str = "result";
/// `failure-description` field name
pub const FAILURE_DESCRIPTION: &str = "failure-description";
/// `error-code` field name
pub const ERROR_CODE: &str = "error-code";
/// `response-headers` field name
pub const RESPONSE_HEADERS: &str = "response-headers";
/// `warnings` field name inside the response headers
pub const WARNINGS: &str = "warnings";

/// Terminal classification of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeKind {
    /// Operation applied
    Success,
    /// Operation failed
    Failed,
    /// Operation cancelled by an administrative action
    Cancelled,
}

impl OutcomeKind {
    /// Wire spelling
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse the wire spelling
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Integer codes carried in `error-code`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum ErrorCode {
    /// Participant-side failure of the operation itself
    OperationFailed = 1,
    /// Malformed request rejected before any remote interaction
    ClientRejection = 2,
    /// I/O failure talking to the participant
    TransportFailure = 3,
    /// Deadline exceeded
    Timeout = 4,
    /// Participant model version cannot accept the request
    VersionIncompatible = 5,
    /// Reserved code for administrative cancellation
    Cancelled = 99,
}

impl ErrorCode {
    /// Integer value
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Map an integer back to a code
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::OperationFailed),
            2 => Some(Self::ClientRejection),
            3 => Some(Self::TransportFailure),
            4 => Some(Self::Timeout),
            5 => Some(Self::VersionIncompatible),
            99 => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Successful outcome wrapping `result`
pub fn success(result: ModelNode) -> ModelNode {
    let mut node = ModelNode::object().with(OUTCOME, OutcomeKind::Success.as_str());
    if result.is_defined() {
        node.set(RESULT, result);
    }
    node
}

/// Failed outcome
pub fn failed(description: impl Into<String>, code: ErrorCode) -> ModelNode {
    ModelNode::object()
        .with(OUTCOME, OutcomeKind::Failed.as_str())
        .with(FAILURE_DESCRIPTION, description.into())
        .with(ERROR_CODE, code.code())
}

/// Cancelled outcome, always carrying [`ErrorCode::Cancelled`]
pub fn cancelled(description: impl Into<String>) -> ModelNode {
    ModelNode::object()
        .with(OUTCOME, OutcomeKind::Cancelled.as_str())
        .with(FAILURE_DESCRIPTION, description.into())
        .with(ERROR_CODE, ErrorCode::Cancelled.code())
}

/// Outcome node for an error
pub fn from_error(error: &HelmError) -> ModelNode {
    match error {
        HelmError::Cancelled { message } => cancelled(message.clone()),
        other => failed(other.message(), other.error_code()),
    }
}

/// Outcome kind of a result node, if it carries a recognised one
pub fn kind_of(node: &ModelNode) -> Option<OutcomeKind> {
    node.get(OUTCOME).as_str().and_then(OutcomeKind::parse)
}

/// Whether the node reports success
pub fn is_success(node: &ModelNode) -> bool {
    kind_of(node) == Some(OutcomeKind::Success)
}

/// `failure-description` text, if present
pub fn failure_description(node: &ModelNode) -> Option<String> {
    let description = node.get(FAILURE_DESCRIPTION);
    description.is_defined().then(|| description.as_string())
}

/// `error-code`, if present and recognised
pub fn error_code(node: &ModelNode) -> Option<ErrorCode> {
    node.get(ERROR_CODE).as_i64().and_then(ErrorCode::from_code)
}

/// Append a warning to the node's response headers
pub fn add_warning(node: &mut ModelNode, warning: impl Into<String>) {
    node.get_mut(RESPONSE_HEADERS)
        .get_mut(WARNINGS)
        .push(warning.into());
}

/// Warnings attached to the node's response headers
pub fn warnings(node: &ModelNode) -> Vec<String> {
    node.get_path(&[RESPONSE_HEADERS, WARNINGS])
        .as_list()
        .iter()
        .map(ModelNode::as_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_round_trip() {
        let node = success(ModelNode::from(42));
        assert!(is_success(&node));
        assert_eq!(node.get(RESULT), &ModelNode::Int(42));
        assert!(failure_description(&node).is_none());
    }

    #[test]
    fn cancelled_uses_reserved_code() {
        let node = cancelled("cancelled by administrator");
        assert_eq!(kind_of(&node), Some(OutcomeKind::Cancelled));
        assert_eq!(error_code(&node), Some(ErrorCode::Cancelled));
        assert_eq!(
            from_error(&HelmError::cancelled("x")).get(ERROR_CODE),
            &ModelNode::Int(99)
        );
    }

    #[test]
    fn failure_from_transport_error() {
        let node = from_error(&HelmError::transport("connection reset"));
        assert_eq!(kind_of(&node), Some(OutcomeKind::Failed));
        assert_eq!(failure_description(&node).as_deref(), Some("connection reset"));
        assert_eq!(error_code(&node), Some(ErrorCode::TransportFailure));
    }

    #[test]
    fn warnings_accumulate() {
        let mut node = success(ModelNode::Undefined);
        add_warning(&mut node, "first");
        add_warning(&mut node, "second");
        assert_eq!(warnings(&node), vec!["first", "second"]);
    }
}
