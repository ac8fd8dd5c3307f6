//! Message types and a scripted client shared by unit tests

use crate::{Message, OperationPoller, OperationStatus, OperationsClient, TransportError, TypeRegistry};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct EchoRequest {
    pub msg: String,
}

impl Message for EchoRequest {
    const TYPE_NAME: &'static str = "echo.EchoRequest";
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct EchoResponse {
    pub msg: String,
}

impl Message for EchoResponse {
    const TYPE_NAME: &'static str = "echo.EchoResponse";
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct OtherResponse {
    pub count: u32,
}

impl Message for OtherResponse {
    const TYPE_NAME: &'static str = "echo.OtherResponse";
}

/// Encodes to a bare number, not an object
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct Unit(pub u32);

impl Message for Unit {
    const TYPE_NAME: &'static str = "echo.Unit";
}

/// Placeholder that stands for "no message"
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Tombstone {
    pub reason: String,
}

impl Message for Tombstone {
    const TYPE_NAME: &'static str = "echo.Tombstone";

    fn is_present(&self) -> bool {
        false
    }
}

pub(crate) fn echo_registry() -> Arc<TypeRegistry> {
    Arc::new(
        TypeRegistry::new()
            .with::<EchoResponse>()
            .with::<OtherResponse>(),
    )
}

/// Replays queued transport results in order.
///
/// Once the queue is empty the repeating status (if set) is returned for
/// every call; otherwise calls fail with a request error.
#[derive(Default)]
pub(crate) struct ScriptedClient {
    script: Mutex<VecDeque<Result<OperationStatus, TransportError>>>,
    repeat: Mutex<Option<OperationStatus>>,
    triggers: AtomicU32,
    polls: AtomicU32,
    polled: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn new(script: Vec<Result<OperationStatus, TransportError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    pub fn repeating(self, status: OperationStatus) -> Self {
        *self.repeat.lock().unwrap() = Some(status);
        self
    }

    pub fn stop_repeating(&self) {
        self.repeat.lock().unwrap().take();
    }

    pub fn push(&self, result: Result<OperationStatus, TransportError>) {
        self.script.lock().unwrap().push_back(result);
    }

    pub fn triggers(&self) -> u32 {
        self.triggers.load(Ordering::SeqCst)
    }

    pub fn polls(&self) -> u32 {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn polled_names(&self) -> Vec<String> {
        self.polled.lock().unwrap().clone()
    }

    fn next(&self) -> Result<OperationStatus, TransportError> {
        if let Some(result) = self.script.lock().unwrap().pop_front() {
            return result;
        }
        match self.repeat.lock().unwrap().clone() {
            Some(status) => Ok(status),
            None => Err(TransportError::Request("script exhausted".into())),
        }
    }
}

impl OperationPoller for ScriptedClient {
    fn get(&self, name: &str) -> impl Future<Output = Result<OperationStatus, TransportError>> + Send {
        self.polls.fetch_add(1, Ordering::SeqCst);
        self.polled.lock().unwrap().push(name.to_owned());
        let result = self.next();
        async move { result }
    }
}

impl OperationsClient<EchoRequest> for ScriptedClient {
    fn trigger(
        &self,
        _request: &EchoRequest,
    ) -> impl Future<Output = Result<OperationStatus, TransportError>> + Send {
        self.triggers.fetch_add(1, Ordering::SeqCst);
        let result = self.next();
        async move { result }
    }
}
