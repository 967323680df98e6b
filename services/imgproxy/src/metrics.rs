//! Request counters.
//!
//! The HTTP layer owns a [`MetricsSink`] and reports every request outcome
//! to it. Counts live for the process lifetime only.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters the service reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    /// An image was served.
    RequestSuccess,
    /// An image request failed.
    RequestError,
}

impl Counter {
    pub fn name(&self) -> &'static str {
        match self {
            Counter::RequestSuccess => "requests_success",
            Counter::RequestError => "requests_error",
        }
    }
}

/// Destination for counter increments.
pub trait MetricsSink: Send + Sync {
    fn increment(&self, counter: Counter);
}

/// In-process atomic counters.
#[derive(Debug, Default)]
pub struct RequestCounters {
    success: AtomicU64,
    error: AtomicU64,
}

/// Point-in-time copy of [`RequestCounters`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterSnapshot {
    pub success: u64,
    pub error: u64,
}

impl RequestCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            success: self.success.load(Ordering::Relaxed),
            error: self.error.load(Ordering::Relaxed),
        }
    }
}

impl MetricsSink for RequestCounters {
    fn increment(&self, counter: Counter) {
        let slot = match counter {
            Counter::RequestSuccess => &self.success,
            Counter::RequestError => &self.error,
        };
        slot.fetch_add(1, Ordering::Relaxed);
    }
}
