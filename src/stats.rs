//! Operation statistics

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by the operations of one client
pub struct OperationStats {
    pub triggers: AtomicU64,
    pub polls: AtomicU64,
    pub transport_errors: AtomicU64,
    pub succeeded: AtomicU64,
    pub failed: AtomicU64,
    pub timeouts: AtomicU64,
    pub cancellations: AtomicU64,
}

impl OperationStats {
    pub fn new() -> Self {
        Self {
            triggers: AtomicU64::new(0),
            polls: AtomicU64::new(0),
            transport_errors: AtomicU64::new(0),
            succeeded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            cancellations: AtomicU64::new(0),
        }
    }

    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> OperationStatsSnapshot {
        OperationStatsSnapshot {
            triggers: self.triggers.load(Ordering::Relaxed),
            polls: self.polls.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            cancellations: self.cancellations.load(Ordering::Relaxed),
        }
    }
}

impl Default for OperationStats {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OperationStatsSnapshot {
    pub triggers: u64,
    pub polls: u64,
    pub transport_errors: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub timeouts: u64,
    pub cancellations: u64,
}
