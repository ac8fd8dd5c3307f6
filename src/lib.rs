//! Typed Long-Running Operations for Remote Services
//!
//! Drives a remote long-running operation from the client side: trigger it,
//! poll its status with deadline-bounded exponential backoff, and decode the
//! type-tagged terminal result into the statically expected response type.
//! Progress is kept in a serializable snapshot that can be stored and resumed.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! // 1. Register the response schemas the remote side may return
//! let registry = Arc::new(TypeRegistry::new().with::<ExportResponse>());
//!
//! // 2. Build a client (HTTP, or any OperationsClient implementation)
//! let client = HttpOperationsClient::new(
//!     HttpTransport::new(reqwest::Client::new()),
//!     "https://api.example.com/v1/exports",
//!     "https://api.example.com/v1",
//! );
//!
//! // 3. Trigger and wait
//! let mut op = LongRunningOperation::<_, ExportRequest, ExportResponse>::new(client, registry, request);
//! let resp = op.await_completion(Duration::from_secs(600)).await?;
//! ```

#![warn(missing_docs)]

// === Core Types ===
mod envelope;
mod errors;
mod message;
mod registry;
mod state;
mod status;

// === Traits ===
mod traits;

// === Execution ===
mod config;
mod operation;
mod retry;

// === Storage ===
mod journal;

// === Observability ===
mod observer;
mod stats;

// === Helpers ===
mod helpers;

// === Transport ===
#[cfg(feature = "http")]
mod transport;

#[cfg(test)]
mod testing;

// === Re-exports ===

// Types
pub use envelope::Envelope;
pub use message::{type_name_from_url, AnyPayload, Message, TYPE_TAG_KEY, TYPE_URL_PREFIX};
pub use registry::TypeRegistry;
pub use status::{OperationStatus, RpcStatus};

// State
pub use state::{OperationState, Phase};

// Errors
pub use errors::{CodecError, LroError, OperationFailure, TransportError};

// Traits
pub use traits::{FnClient, OperationPoller, OperationsClient};

// Execution
pub use config::PollConfig;
pub use operation::{LongRunningOperation, Progress};
pub use retry::{retry_until_deadline, Attempt, RetryError, RetryExecutor, RetryPolicy};

// Storage
pub use journal::{InMemoryJournal, JournalEntry, JournalError, OperationJournal};

// Observability
pub use observer::{NoOpObserver, OperationObserver, TracingObserver};
pub use stats::{OperationStats, OperationStatsSnapshot};

// Helpers
pub use helpers::{
    persist_state, prune_terminal, recover_operations, run_to_completion, wait_for_result,
};

// Transport
#[cfg(feature = "http")]
pub use transport::{join_headers, Headers, HttpOperationsClient, HttpResponse, HttpTransport};
