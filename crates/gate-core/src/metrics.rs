//! Counters for gate activity
//!
//! Thread-safe, lock-free. Read with [`GateMetrics::snapshot`].
//!
//! ## Usage
//!
//! ```ignore
//! let metrics = controller.metrics();
//! let snapshot = metrics.snapshot();
//! tracing::info!(allowed = snapshot.decisions_allowed, "gate activity");
//! ```

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::Verdict;

#[derive(Debug, Default)]
pub struct GateMetrics {
    pub decisions_allowed: AtomicU64,
    pub decisions_redirected: AtomicU64,
    /// Redirects caused by a store failure or exhausted stale retries
    pub decisions_failed_closed: AtomicU64,
    pub stale_retries: AtomicU64,
    pub store_failures: AtomicU64,
    pub logins_authorized: AtomicU64,
    pub logins_denied: AtomicU64,
    pub logouts: AtomicU64,
    pub sessions_released: AtomicU64,
}

impl GateMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_verdict(&self, verdict: Verdict) {
        if verdict.is_allow() {
            self.decisions_allowed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.decisions_redirected.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_fail_closed(&self) {
        self.decisions_redirected.fetch_add(1, Ordering::Relaxed);
        self.decisions_failed_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_retry(&self) {
        self.stale_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store_failure(&self) {
        self.store_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_login(&self, authorized: bool, released: usize) {
        if authorized {
            self.logins_authorized.fetch_add(1, Ordering::Relaxed);
            self.sessions_released
                .fetch_add(released as u64, Ordering::Relaxed);
        } else {
            self.logins_denied.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_logout(&self) {
        self.logouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            decisions_allowed: self.decisions_allowed.load(Ordering::Relaxed),
            decisions_redirected: self.decisions_redirected.load(Ordering::Relaxed),
            decisions_failed_closed: self.decisions_failed_closed.load(Ordering::Relaxed),
            stale_retries: self.stale_retries.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
            logins_authorized: self.logins_authorized.load(Ordering::Relaxed),
            logins_denied: self.logins_denied.load(Ordering::Relaxed),
            logouts: self.logouts.load(Ordering::Relaxed),
            sessions_released: self.sessions_released.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`GateMetrics`]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub decisions_allowed: u64,
    pub decisions_redirected: u64,
    pub decisions_failed_closed: u64,
    pub stale_retries: u64,
    pub store_failures: u64,
    pub logins_authorized: u64,
    pub logins_denied: u64,
    pub logouts: u64,
    pub sessions_released: u64,
}

impl MetricsSnapshot {
    pub fn total_decisions(&self) -> u64 {
        self.decisions_allowed + self.decisions_redirected
    }
}
