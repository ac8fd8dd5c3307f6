//! Helper functions for driving and recovering operations

use crate::{
    retry_until_deadline, JournalError, LongRunningOperation, LroError, Message,
    OperationFailure, OperationJournal, OperationPoller, OperationState, OperationStatus,
    OperationsClient, PollConfig, RetryError, TransportError, TypeRegistry,
};
use std::fmt;
use std::sync::Arc;

/// Trigger an operation and wait for its response.
///
/// ```rust,ignore
/// let resp: EchoResponse =
///     run_to_completion(client, registry, EchoRequest { msg: "ping".into() }, &config).await?;
/// ```
pub async fn run_to_completion<C, Req, Resp>(
    client: C,
    registry: Arc<TypeRegistry>,
    request: Req,
    config: &PollConfig,
) -> Result<Resp, LroError>
where
    C: OperationsClient<Req>,
    Req: Message,
    Resp: Message,
{
    let mut op = LongRunningOperation::<C, Req, Resp>::new(client, registry, request);
    op.await_with_config(config).await?;
    op.into_state()
        .into_response()
        .ok_or(LroError::Failed(OperationFailure::MissingResponse))
}

/// Why a single poll in `wait_for_result` did not finish
enum PollMiss {
    Pending,
    Transport(TransportError),
}

impl fmt::Display for PollMiss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("operation still in progress"),
            Self::Transport(e) => write!(f, "{e}"),
        }
    }
}

/// Wait for an operation started elsewhere, knowing only its name.
///
/// Unlike `LongRunningOperation`, transport errors here are retried until
/// the deadline: the caller holds no state worth protecting. If the
/// deadline passes while the last poll failed at the transport, that error
/// is returned instead of a timeout.
pub async fn wait_for_result<P, Resp>(
    poller: &P,
    registry: &TypeRegistry,
    name: &str,
    config: &PollConfig,
) -> Result<Resp, LroError>
where
    P: OperationPoller,
    Resp: Message,
{
    let outcome = retry_until_deadline(&config.retry, config.await_timeout(), || async move {
        match poller.get(name).await {
            Ok(status) if status.done => Ok(status),
            Ok(_) => Err(PollMiss::Pending),
            Err(e) => Err(PollMiss::Transport(e)),
        }
    })
    .await;

    let status = match outcome {
        Ok(status) => status,
        Err(RetryError::Exhausted {
            last: PollMiss::Transport(e),
            ..
        }) => return Err(LroError::Failed(e.into())),
        Err(
            RetryError::Exhausted {
                attempts, elapsed, ..
            }
            | RetryError::Interrupted { attempts, elapsed },
        ) => return Err(LroError::Timeout { attempts, elapsed }),
        Err(RetryError::Cancelled { attempts, .. }) => return Err(LroError::Cancelled { attempts }),
    };

    materialize_terminal(registry, status)
}

fn materialize_terminal<Resp: Message>(
    registry: &TypeRegistry,
    status: OperationStatus,
) -> Result<Resp, LroError> {
    if let Some(rpc) = status.error {
        return Err(OperationFailure::Remote {
            code: rpc.code,
            message: rpc.message.into(),
        }
        .into());
    }
    let payload = status.response.ok_or(OperationFailure::MissingResponse)?;
    Ok(registry.materialize(payload)?)
}

/// Store a snapshot of an operation under its name
pub fn persist_state<Req: Message, Resp: Message>(
    journal: &dyn OperationJournal,
    state: &OperationState<Req, Resp>,
) -> Result<u64, JournalError> {
    let snapshot = serde_json::to_value(state).map_err(|e| JournalError::Codec(e.into()))?;
    journal.save(state.name(), snapshot)
}

/// Load every journaled operation that has not reached a terminal phase.
///
/// Resume each with `LongRunningOperation::resume` to continue polling
/// after a restart.
pub fn recover_operations<Req: Message, Resp: Message>(
    journal: &dyn OperationJournal,
) -> Result<Vec<OperationState<Req, Resp>>, JournalError> {
    let mut pending = Vec::new();
    for name in journal.list_operations()? {
        let entry = journal.load(&name)?;
        let state: OperationState<Req, Resp> =
            serde_json::from_value(entry.snapshot).map_err(|e| JournalError::Codec(e.into()))?;
        if !state.phase().is_terminal() {
            pending.push(state);
        }
    }
    tracing::debug!(count = pending.len(), "Recovered in-flight operations");
    Ok(pending)
}

/// Remove journaled operations that reached a terminal phase.
///
/// Returns how many snapshots were removed. Entries that fail to decode as
/// `OperationState<Req, Resp>` are left alone.
pub fn prune_terminal<Req: Message, Resp: Message>(
    journal: &dyn OperationJournal,
) -> Result<usize, JournalError> {
    let mut removed = 0;
    for name in journal.list_operations()? {
        let entry = journal.load(&name)?;
        let Ok(state) = serde_json::from_value::<OperationState<Req, Resp>>(entry.snapshot) else {
            continue;
        };
        if state.phase().is_terminal() {
            journal.remove(&name)?;
            removed += 1;
        }
    }
    tracing::debug!(removed, "Pruned terminal operations");
    Ok(removed)
}
