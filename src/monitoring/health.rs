//! Health data served on `/api/health`.
//!
//! Counters are updated from request handlers and middleware, so they are
//! plain atomics rather than a lock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Shared health state, cheap to clone into handlers.
#[derive(Clone)]
pub struct HealthState {
    inner: Arc<HealthData>,
}

struct HealthData {
    started_at: DateTime<Utc>,
    redirects: AtomicU64,
    backend_failures: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub status: &'static str,
    pub started_at: DateTime<Utc>,
    pub uptime_seconds: i64,
    pub redirects_issued: u64,
    pub backend_failures: u64,
}

impl HealthState {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(HealthData {
                started_at: Utc::now(),
                redirects: AtomicU64::new(0),
                backend_failures: AtomicU64::new(0),
            }),
        }
    }

    pub fn record_redirect(&self) {
        self.inner.redirects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_backend_failure(&self) {
        self.inner.backend_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            status: "ok",
            started_at: self.inner.started_at,
            uptime_seconds: (Utc::now() - self.inner.started_at).num_seconds(),
            redirects_issued: self.inner.redirects.load(Ordering::Relaxed),
            backend_failures: self.inner.backend_failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_state_creation() {
        let state = HealthState::new();
        let snapshot = state.snapshot();
        assert_eq!(snapshot.status, "ok");
        assert_eq!(snapshot.redirects_issued, 0);
        assert_eq!(snapshot.backend_failures, 0);
    }

    #[test]
    fn test_counters_shared_between_clones() {
        let state = HealthState::new();
        let clone = state.clone();
        clone.record_redirect();
        clone.record_redirect();
        state.record_backend_failure();

        let snapshot = state.snapshot();
        assert_eq!(snapshot.redirects_issued, 2);
        assert_eq!(snapshot.backend_failures, 1);
    }

    #[test]
    fn test_snapshot_serializes() {
        let json = serde_json::to_value(HealthState::new().snapshot()).unwrap();
        assert_eq!(json["status"], "ok");
        assert!(json["uptime_seconds"].is_i64());
    }
}
