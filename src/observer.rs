//! Operation observer trait

use crate::OperationFailure;

/// Observer trait for external observability
pub trait OperationObserver: Send + Sync + 'static {
    fn on_triggered(&self, name: &str);
    fn on_polled(&self, name: &str, done: bool);
    fn on_succeeded(&self, name: &str, response_type: &str);
    fn on_failed(&self, name: &str, failure: &OperationFailure);
    fn on_timed_out(&self, name: &str, attempts: u32, elapsed_millis: u64);
}

/// No-op observer
pub struct NoOpObserver;

impl OperationObserver for NoOpObserver {
    fn on_triggered(&self, _name: &str) {}
    fn on_polled(&self, _name: &str, _done: bool) {}
    fn on_succeeded(&self, _name: &str, _response_type: &str) {}
    fn on_failed(&self, _name: &str, _failure: &OperationFailure) {}
    fn on_timed_out(&self, _name: &str, _attempts: u32, _elapsed_millis: u64) {}
}

/// Tracing-based observer
pub struct TracingObserver;

impl OperationObserver for TracingObserver {
    fn on_triggered(&self, name: &str) {
        tracing::info!(operation = %name, "Operation triggered");
    }

    fn on_polled(&self, name: &str, done: bool) {
        tracing::debug!(operation = %name, done, "Operation polled");
    }

    fn on_succeeded(&self, name: &str, response_type: &str) {
        tracing::info!(operation = %name, response_type = %response_type, "Operation succeeded");
    }

    fn on_failed(&self, name: &str, failure: &OperationFailure) {
        tracing::error!(operation = %name, error = %failure, "Operation failed");
    }

    fn on_timed_out(&self, name: &str, attempts: u32, elapsed_millis: u64) {
        tracing::warn!(operation = %name, attempts, elapsed_ms = elapsed_millis, "Operation still running at deadline");
    }
}
