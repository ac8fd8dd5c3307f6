//! Polling configuration

use crate::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How long and how often to poll an operation.
///
/// Every field has a default, so a partial document (or `{}`) is valid:
///
/// ```json
/// { "await_timeout_millis": 30000, "retry": { "max_delay_millis": 5000 } }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Backoff between polls
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Overall deadline for one `await_completion` call (milliseconds)
    #[serde(default = "default_await_timeout_millis")]
    pub await_timeout_millis: u64,
}

fn default_await_timeout_millis() -> u64 {
    10 * 60 * 1000
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            await_timeout_millis: default_await_timeout_millis(),
        }
    }
}

impl PollConfig {
    /// Parse a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Overall await deadline
    pub fn await_timeout(&self) -> Duration {
        Duration::from_millis(self.await_timeout_millis)
    }

    /// Override the await deadline; durations beyond `u64::MAX` millis saturate
    pub fn with_await_timeout(mut self, timeout: Duration) -> Self {
        self.await_timeout_millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }
}
