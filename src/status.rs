//! Operation status as reported by the remote side

use crate::message::AnyPayload;
use serde::{Deserialize, Serialize};

/// Snapshot of a remote operation returned by trigger and poll calls.
///
/// JSON layout follows `google.longrunning.Operation`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OperationStatus {
    /// Remote-assigned operation name
    pub name: String,
    /// Service-specific progress metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<AnyPayload>,
    /// Whether the operation reached a terminal state
    pub done: bool,
    /// Embedded failure, set on unsuccessful completion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcStatus>,
    /// Type-tagged result, set on successful completion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<AnyPayload>,
}

impl OperationStatus {
    /// An operation still in progress
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// A successfully completed operation
    pub fn succeeded(name: impl Into<String>, response: AnyPayload) -> Self {
        Self {
            name: name.into(),
            done: true,
            response: Some(response),
            ..Self::default()
        }
    }

    /// A failed operation
    pub fn failed(name: impl Into<String>, error: RpcStatus) -> Self {
        Self {
            name: name.into(),
            done: true,
            error: Some(error),
            ..Self::default()
        }
    }
}

/// Error status embedded in a completed operation
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcStatus {
    /// Canonical status code
    pub code: i32,
    /// Developer-facing message
    pub message: String,
    /// Additional error details, kept opaque
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<serde_json::Value>,
}

impl RpcStatus {
    /// Create a status without details
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: Vec::new(),
        }
    }
}
