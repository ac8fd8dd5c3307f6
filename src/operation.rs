//! Long-running operation state machine
//!
//! `LongRunningOperation` owns the transport client, the type registry used
//! to decode terminal results, and the observed `OperationState`.
//!
//! ```text
//! Uninitiated --trigger--> InProgress --get--> InProgress
//!      |                       |
//!      +-----------------------+--> Succeeded | Failed   (sinks)
//! ```
//!
//! `advance` performs at most one remote call. `await_completion` drives
//! `advance` through the `RetryExecutor` until the operation is terminal or
//! the deadline passes.

use crate::retry::Attempt;
use crate::stats::OperationStats;
use crate::{
    Envelope, LroError, Message, NoOpObserver, OperationFailure, OperationJournal,
    OperationObserver, OperationPoller, OperationState, OperationsClient, Phase, PollConfig,
    RetryError, RetryExecutor, RetryPolicy, TypeRegistry,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Result of a single `advance` step that did not fail
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Progress {
    /// Remote side has not finished; keep polling
    Pending,
    /// Operation succeeded and the response is stored
    Complete,
}

/// Typed driver for one remote operation.
///
/// Not meant to be advanced from several tasks at once: `advance` takes
/// `&mut self`. Run one driver per operation when polling many.
pub struct LongRunningOperation<C, Req: Message, Resp: Message> {
    client: C,
    registry: Arc<TypeRegistry>,
    state: OperationState<Req, Resp>,
    policy: RetryPolicy,
    observer: Arc<dyn OperationObserver>,
    stats: Arc<OperationStats>,
    journal: Option<Arc<dyn OperationJournal>>,
}

impl<C, Req, Resp> LongRunningOperation<C, Req, Resp>
where
    C: OperationsClient<Req>,
    Req: Message,
    Resp: Message,
{
    /// Create an operation that has not been triggered yet
    pub fn new(client: C, registry: Arc<TypeRegistry>, request: Req) -> Self {
        Self::resume(client, registry, OperationState::new(request))
    }

    /// Rebuild an operation from a stored snapshot
    pub fn resume(client: C, registry: Arc<TypeRegistry>, state: OperationState<Req, Resp>) -> Self {
        Self {
            client,
            registry,
            state,
            policy: RetryPolicy::default(),
            observer: Arc::new(NoOpObserver),
            stats: Arc::new(OperationStats::new()),
            journal: None,
        }
    }

    /// Use a custom backoff policy for `await_completion`
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Report lifecycle events to an observer
    pub fn with_observer(mut self, observer: Arc<dyn OperationObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Count events into shared statistics
    pub fn with_stats(mut self, stats: Arc<OperationStats>) -> Self {
        self.stats = stats;
        self
    }

    /// Persist a snapshot after every observed change
    pub fn with_journal(mut self, journal: Arc<dyn OperationJournal>) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Observed state
    pub fn state(&self) -> &OperationState<Req, Resp> {
        &self.state
    }

    /// Take the observed state, e.g. to persist it
    pub fn into_state(self) -> OperationState<Req, Resp> {
        self.state
    }

    /// Remote-assigned name; empty until triggered
    pub fn name(&self) -> &str {
        self.state.name()
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    /// The request the operation was started with
    pub fn request(&self) -> &Req {
        self.state.request()
    }

    /// Decoded response, once succeeded
    pub fn response(&self) -> Option<&Resp> {
        self.state.response()
    }

    /// Recorded terminal failure
    pub fn error(&self) -> Option<&OperationFailure> {
        self.state.error()
    }

    /// Perform at most one remote call and record what it reported.
    ///
    /// Every `Err` is terminal and stored. Once terminal, further calls
    /// return the recorded outcome without touching the transport.
    pub async fn advance(&mut self) -> Result<Progress, OperationFailure> {
        if let Some(failure) = self.state.error() {
            return Err(failure.clone());
        }
        if self.state.done {
            return Ok(Progress::Complete);
        }

        let triggering = self.state.name.is_empty();
        let result = if triggering {
            OperationStats::incr(&self.stats.triggers);
            self.client.trigger(self.state.request()).await
        } else {
            OperationStats::incr(&self.stats.polls);
            self.client.get(&self.state.name).await
        };

        let status = match result {
            Ok(status) => status,
            Err(err) => {
                OperationStats::incr(&self.stats.transport_errors);
                return Err(self.fail(err.into()));
            }
        };

        self.adopt_name(status.name);
        if triggering && !self.state.name.is_empty() {
            self.observer.on_triggered(&self.state.name);
        }
        self.observer.on_polled(&self.state.name, status.done);

        if !status.done {
            if self.state.name.is_empty() {
                return Err(self.fail(OperationFailure::MissingName));
            }
            self.persist();
            return Ok(Progress::Pending);
        }

        self.state.done = true;
        if let Some(rpc) = status.error {
            return Err(self.fail(OperationFailure::Remote {
                code: rpc.code,
                message: rpc.message.into(),
            }));
        }

        let Some(payload) = status.response else {
            return Err(self.fail(OperationFailure::MissingResponse));
        };

        match self.registry.materialize::<Resp>(payload) {
            Ok(response) => {
                self.state.response = Some(Envelope::new(response));
                OperationStats::incr(&self.stats.succeeded);
                self.observer.on_succeeded(&self.state.name, Resp::TYPE_NAME);
                self.persist();
                Ok(Progress::Complete)
            }
            Err(failure) => Err(self.fail(failure)),
        }
    }

    /// Poll until terminal or until `timeout` passes.
    ///
    /// A call still in flight at the deadline is dropped. A timeout is not
    /// recorded on the operation; calling again resumes polling where it
    /// stopped.
    pub async fn await_completion(&mut self, timeout: Duration) -> Result<&Resp, LroError> {
        self.await_completion_with_cancel(timeout, &CancellationToken::new())
            .await
    }

    /// Poll with the deadline and backoff from a `PollConfig`
    pub async fn await_with_config(&mut self, config: &PollConfig) -> Result<&Resp, LroError> {
        let executor = RetryExecutor::new(config.retry.clone());
        self.drive(&executor, config.await_timeout(), &CancellationToken::new())
            .await
    }

    /// Poll until terminal, deadline or cancellation.
    ///
    /// Cancellation aborts an in-flight transport call; nothing from an
    /// aborted call is recorded.
    pub async fn await_completion_with_cancel(
        &mut self,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<&Resp, LroError> {
        let executor = RetryExecutor::new(self.policy.clone());
        self.drive(&executor, timeout, cancel).await
    }

    async fn drive(
        &mut self,
        executor: &RetryExecutor,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<&Resp, LroError> {
        let outcome = executor
            .run_with_cancel(timeout, cancel, &mut AdvanceAttempt(&mut *self))
            .await;

        match outcome {
            Ok(()) => {}
            Err(
                RetryError::Exhausted {
                    attempts, elapsed, ..
                }
                | RetryError::Interrupted { attempts, elapsed },
            ) => {
                OperationStats::incr(&self.stats.timeouts);
                let elapsed_millis = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
                self.observer
                    .on_timed_out(&self.state.name, attempts, elapsed_millis);
                return Err(LroError::Timeout { attempts, elapsed });
            }
            Err(RetryError::Cancelled { attempts, .. }) => {
                OperationStats::incr(&self.stats.cancellations);
                return Err(LroError::Cancelled { attempts });
            }
        }

        if let Some(failure) = self.state.error() {
            return Err(LroError::Failed(failure.clone()));
        }
        self.state
            .response()
            .ok_or(LroError::Failed(OperationFailure::MissingResponse))
    }

    fn adopt_name(&mut self, name: String) {
        if self.state.name.is_empty() {
            self.state.name = name;
        } else if !name.is_empty() && name != self.state.name {
            tracing::warn!(
                operation = %self.state.name,
                reported = %name,
                "Remote side reported a different operation name; keeping the original"
            );
        }
    }

    fn fail(&mut self, failure: OperationFailure) -> OperationFailure {
        OperationStats::incr(&self.stats.failed);
        self.observer.on_failed(&self.state.name, &failure);
        let failure = self.state.fail(failure);
        self.persist();
        failure
    }

    fn persist(&self) {
        let Some(journal) = &self.journal else {
            return;
        };
        if self.state.name.is_empty() {
            return;
        }
        if let Err(e) = crate::persist_state(journal.as_ref(), &self.state) {
            tracing::warn!(operation = %self.state.name, error = %e, "Failed to journal operation snapshot");
        }
    }
}

/// Adapts one `advance` call to the retry executor: pending is a retryable
/// failure, any terminal outcome ends the loop.
struct AdvanceAttempt<'a, C, Req: Message, Resp: Message>(&'a mut LongRunningOperation<C, Req, Resp>);

#[derive(Debug)]
struct StillRunning;

impl std::fmt::Display for StillRunning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("operation still in progress")
    }
}

impl<C, Req, Resp> Attempt for AdvanceAttempt<'_, C, Req, Resp>
where
    C: OperationsClient<Req>,
    Req: Message,
    Resp: Message,
{
    type Output = ();
    type Error = StillRunning;

    fn attempt(&mut self) -> impl Future<Output = Result<(), StillRunning>> + Send {
        async move {
            match self.0.advance().await {
                Ok(Progress::Pending) => Err(StillRunning),
                Ok(Progress::Complete) | Err(_) => Ok(()),
            }
        }
    }
}
