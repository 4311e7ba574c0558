//! # Request and Check-in Metrics
//!
//! Lightweight in-process counters using atomics, served as JSON at
//! `/v1/metrics`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use evreg_core::CheckInStatus;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Shared metrics state. Clones share the counters.
#[derive(Debug, Clone, Default)]
pub struct ApiMetrics {
    counters: Arc<Counters>,
}

#[derive(Debug, Default)]
struct Counters {
    requests: AtomicU64,
    errors: AtomicU64,
    success: AtomicU64,
    duplicate: AtomicU64,
    not_found: AtomicU64,
    unrecognized: AtomicU64,
    unavailable: AtomicU64,
}

/// Point-in-time copy of every counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MetricsSnapshot {
    /// Requests that passed through the API router.
    pub requests: u64,
    /// Responses with a 4xx or 5xx status.
    pub errors: u64,
    pub checkins_success: u64,
    pub checkins_duplicate: u64,
    pub checkins_not_found: u64,
    /// Scans rejected as an unrecognized code format.
    pub checkins_unrecognized: u64,
    /// Scans that failed because the participant store was unavailable.
    pub checkins_unavailable: u64,
}

impl ApiMetrics {
    /// Create a new metrics instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a completed check-in by its outcome.
    pub fn record_outcome(&self, status: CheckInStatus) {
        let counter = match status {
            CheckInStatus::Success => &self.counters.success,
            CheckInStatus::Duplicate => &self.counters.duplicate,
            CheckInStatus::NotFound => &self.counters.not_found,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a scan rejected by the normalizer.
    pub fn record_unrecognized(&self) {
        self.counters.unrecognized.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a scan that failed because the store could not be reached.
    pub fn record_unavailable(&self) {
        self.counters.unavailable.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let c = &self.counters;
        MetricsSnapshot {
            requests: c.requests.load(Ordering::Relaxed),
            errors: c.errors.load(Ordering::Relaxed),
            checkins_success: c.success.load(Ordering::Relaxed),
            checkins_duplicate: c.duplicate.load(Ordering::Relaxed),
            checkins_not_found: c.not_found.load(Ordering::Relaxed),
            checkins_unrecognized: c.unrecognized.load(Ordering::Relaxed),
            checkins_unavailable: c.unavailable.load(Ordering::Relaxed),
        }
    }
}

/// Middleware that increments request and error counters.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        m.counters.requests.fetch_add(1, Ordering::Relaxed);
        if response.status().is_server_error() || response.status().is_client_error() {
            m.counters.errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    response
}
