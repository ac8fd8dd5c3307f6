//! Error types for operation failures, transport and message codecs

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Terminal failure recorded on an operation.
///
/// Once stored, a failure is part of the operation's permanent state and is
/// returned verbatim by every later `advance` call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperationFailure {
    /// Trigger or poll call failed at the transport level
    #[error("transport: {message}")]
    Transport {
        /// Error description
        message: Box<str>,
    },
    /// Remote side completed the operation with an embedded error
    #[error("code: {code}, message: {message}")]
    Remote {
        /// Status code reported by the remote side
        code: i32,
        /// Status message reported by the remote side
        message: Box<str>,
    },
    /// Terminal payload decoded to a type other than the expected response
    #[error("unexpected response message of different type received: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Type name the operation was declared with
        expected: Box<str>,
        /// Type tag carried by the payload
        actual: Box<str>,
    },
    /// Terminal payload could not be parsed for its resolved schema
    #[error("unmarshal response {type_tag}: {reason}")]
    Decode {
        /// Type tag carried by the payload
        type_tag: Box<str>,
        /// Error description
        reason: Box<str>,
    },
    /// No schema is registered for the payload's type tag
    #[error("no schema registered for type tag {type_tag}")]
    UnknownType {
        /// Type tag carried by the payload
        type_tag: Box<str>,
    },
    /// Remote side reported a pending operation without naming it
    #[error("remote side returned an in-progress operation without a name")]
    MissingName,
    /// Remote side reported completion with neither a response nor an error
    #[error("operation completed without a response or an error")]
    MissingResponse,
}

impl OperationFailure {
    /// Check if the failure was reported by the remote side
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }

    /// Check if the failure came from the transport
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Remote status code, if this is a remote failure
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Remote { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<TransportError> for OperationFailure {
    fn from(err: TransportError) -> Self {
        Self::Transport {
            message: err.to_string().into(),
        }
    }
}

/// Error returned by the completion drivers
#[derive(Debug, thiserror::Error)]
pub enum LroError {
    /// The operation reached a terminal failure
    #[error(transparent)]
    Failed(#[from] OperationFailure),
    /// The deadline passed while the operation was still in progress.
    ///
    /// Not stored on the operation: awaiting again may continue polling.
    #[error("timed out after {attempts} attempts over {elapsed:?} while operation still in progress")]
    Timeout {
        /// Number of attempts made
        attempts: u32,
        /// Time spent before giving up
        elapsed: Duration,
    },
    /// Waiting was cancelled through a cancellation token
    #[error("cancelled after {attempts} attempts")]
    Cancelled {
        /// Number of attempts started
        attempts: u32,
    },
}

impl LroError {
    /// Check if this is a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// The terminal failure, if any
    pub fn failure(&self) -> Option<&OperationFailure> {
        match self {
            Self::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Error from a trigger or poll transport call
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Request could not be built or sent
    #[error("request failed: {0}")]
    Request(Box<str>),
    /// Remote side answered with a non-success status
    #[error("status {status}, resp body: {body}")]
    Status {
        /// HTTP-like status code (>= 300)
        status: u16,
        /// Response body returned with the failure
        body: Box<str>,
    },
    /// Response body could not be decoded
    #[error("decode response: {0}")]
    Decode(Box<str>),
}

/// Error from encoding or decoding a message
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Document names a different type than the one requested
    #[error("unexpected type found during decode: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Type requested by the caller
        expected: Box<str>,
        /// Type tag found in the document
        actual: Box<str>,
    },
    /// Message did not encode to a JSON object
    #[error("message {type_name} did not encode to a JSON object")]
    NotAnObject {
        /// Type name of the offending message
        type_name: &'static str,
    },
    /// Document is missing its type tag
    #[error("missing type tag")]
    MissingTypeTag,
    /// Malformed document
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}
