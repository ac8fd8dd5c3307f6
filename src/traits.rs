//! Transport collaborators consumed by the operation state machine

use crate::{OperationStatus, TransportError};
use std::future::Future;
use std::sync::Arc;

/// Polls existing operations by name.
///
/// Implementations own their connection handling; the state machine only
/// sees "status or transport error".
pub trait OperationPoller: Send + Sync {
    /// Fetch the current status of a named operation
    fn get(&self, name: &str) -> impl Future<Output = Result<OperationStatus, TransportError>> + Send;
}

/// Starts operations for a request type and polls them.
///
/// # Example
///
/// ```rust,ignore
/// impl OperationsClient<ExportRequest> for ExportService {
///     async fn trigger(&self, request: &ExportRequest) -> Result<OperationStatus, TransportError> {
///         self.http.send_json(Method::POST, &self.export_url, Some(request)).await
///     }
/// }
/// ```
pub trait OperationsClient<Req>: OperationPoller {
    /// Start a new remote operation
    fn trigger(
        &self,
        request: &Req,
    ) -> impl Future<Output = Result<OperationStatus, TransportError>> + Send;
}

impl<P: OperationPoller> OperationPoller for Arc<P> {
    fn get(&self, name: &str) -> impl Future<Output = Result<OperationStatus, TransportError>> + Send {
        (**self).get(name)
    }
}

impl<Req, C: OperationsClient<Req>> OperationsClient<Req> for Arc<C> {
    fn trigger(
        &self,
        request: &Req,
    ) -> impl Future<Output = Result<OperationStatus, TransportError>> + Send {
        (**self).trigger(request)
    }
}

/// Client built from a pair of closures.
///
/// The request is cloned into the trigger closure so the returned future
/// owns everything it needs.
pub struct FnClient<T, G> {
    trigger: T,
    get: G,
}

impl<T, G> FnClient<T, G> {
    /// Create a client from trigger and get closures
    pub fn new(trigger: T, get: G) -> Self {
        Self { trigger, get }
    }
}

impl<T, G, GF> OperationPoller for FnClient<T, G>
where
    T: Send + Sync,
    G: Fn(String) -> GF + Send + Sync,
    GF: Future<Output = Result<OperationStatus, TransportError>> + Send,
{
    fn get(&self, name: &str) -> impl Future<Output = Result<OperationStatus, TransportError>> + Send {
        (self.get)(name.to_owned())
    }
}

impl<Req, T, TF, G, GF> OperationsClient<Req> for FnClient<T, G>
where
    Req: Clone,
    T: Fn(Req) -> TF + Send + Sync,
    TF: Future<Output = Result<OperationStatus, TransportError>> + Send,
    G: Fn(String) -> GF + Send + Sync,
    GF: Future<Output = Result<OperationStatus, TransportError>> + Send,
{
    fn trigger(
        &self,
        request: &Req,
    ) -> impl Future<Output = Result<OperationStatus, TransportError>> + Send {
        (self.trigger)(request.clone())
    }
}
