//! Operation lifecycle state and its serializable snapshot

use crate::{CodecError, Envelope, Message, OperationFailure};
use serde::{Deserialize, Serialize};

/// Lifecycle phase derived from an operation's recorded fields
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Not yet triggered: no name assigned
    Uninitiated,
    /// Named and still running
    InProgress,
    /// Done with a decoded response
    Succeeded,
    /// Done with a recorded failure
    Failed,
}

impl Phase {
    /// Terminal phases are sinks
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Everything observed about one operation.
///
/// Serializes as `{"name", "done", "error", "request", "response"}` with the
/// request and response carried as typed envelopes, so a snapshot can be
/// stored and later resumed with `LongRunningOperation::resume`.
#[derive(Serialize, Deserialize)]
#[serde(bound = "")]
pub struct OperationState<Req: Message, Resp: Message> {
    #[serde(default)]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) done: bool,
    #[serde(default)]
    pub(crate) error: Option<OperationFailure>,
    pub(crate) request: Envelope<Req>,
    #[serde(default)]
    pub(crate) response: Option<Envelope<Resp>>,
}

impl<Req: Message, Resp: Message> OperationState<Req, Resp> {
    /// Fresh state for a request that has not been triggered yet
    pub fn new(request: Req) -> Self {
        Self {
            name: String::new(),
            done: false,
            error: None,
            request: Envelope::new(request),
            response: None,
        }
    }

    /// Remote-assigned name; empty until the first trigger succeeds
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the operation is done (successfully or not)
    pub fn is_done(&self) -> bool {
        self.done || self.error.is_some()
    }

    /// Recorded terminal failure
    pub fn error(&self) -> Option<&OperationFailure> {
        self.error.as_ref()
    }

    /// The request the operation was started with
    pub fn request(&self) -> &Req {
        self.request.get()
    }

    /// Decoded response, once succeeded
    pub fn response(&self) -> Option<&Resp> {
        self.response.as_ref().map(Envelope::get)
    }

    /// Take the decoded response
    pub fn into_response(self) -> Option<Resp> {
        self.response.map(Envelope::into_inner)
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> Phase {
        if self.error.is_some() {
            Phase::Failed
        } else if self.done && self.response.is_some() {
            Phase::Succeeded
        } else if self.name.is_empty() {
            Phase::Uninitiated
        } else {
            Phase::InProgress
        }
    }

    /// Encode the snapshot as JSON bytes
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode a snapshot from JSON bytes
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub(crate) fn fail(&mut self, failure: OperationFailure) -> OperationFailure {
        self.done = true;
        self.error = Some(failure.clone());
        failure
    }
}

impl<Req: Message + Clone, Resp: Message + Clone> Clone for OperationState<Req, Resp> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            done: self.done,
            error: self.error.clone(),
            request: self.request.clone(),
            response: self.response.clone(),
        }
    }
}

impl<Req, Resp> std::fmt::Debug for OperationState<Req, Resp>
where
    Req: Message + std::fmt::Debug,
    Resp: Message + std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationState")
            .field("name", &self.name)
            .field("phase", &self.phase())
            .field("error", &self.error)
            .field("request", &self.request)
            .field("response", &self.response)
            .finish()
    }
}
