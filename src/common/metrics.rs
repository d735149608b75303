//! Client-side counters
//!
//! Plain relaxed atomics.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for tracking request counts
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Command outcomes seen by a [`ShardClient`](crate::client::ShardClient).
#[derive(Debug, Default)]
pub struct ClientMetrics {
    /// Commands issued, including ones that failed
    pub commands: Counter,
    /// Second attempts after a dead connection
    pub retries: Counter,
    /// Commands whose error reached the caller
    pub failures: Counter,
}

impl ClientMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            commands: self.commands.get(),
            retries: self.retries.get(),
            failures: self.failures.get(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub commands: u64,
    pub retries: u64,
    pub failures: u64,
}
