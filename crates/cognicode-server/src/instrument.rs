use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{info, warn};

/// Request counters kept by the coordinator boundary.
#[derive(Debug, Default)]
pub struct RequestMetrics {
    pub handled: AtomicU64,
    pub failed: AtomicU64,
    pub total_millis: AtomicU64,
}

impl RequestMetrics {
    pub fn handled(&self) -> u64 {
        self.handled.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn average_millis(&self) -> f64 {
        let handled = self.handled();
        if handled == 0 {
            return 0.0;
        }
        self.total_millis.load(Ordering::Relaxed) as f64 / handled as f64
    }
}

/// Awaits `operation`, then records its duration and outcome.
pub async fn instrument<F, T, E>(
    metrics: &RequestMetrics,
    operation: &'static str,
    session_id: &str,
    fut: F,
) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    let started = Instant::now();
    let result = fut.await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    metrics.handled.fetch_add(1, Ordering::Relaxed);
    metrics.total_millis.fetch_add(elapsed_ms, Ordering::Relaxed);

    match &result {
        Ok(_) => info!(operation, session_id, elapsed_ms, "Request completed"),
        Err(err) => {
            metrics.failed.fetch_add(1, Ordering::Relaxed);
            warn!(operation, session_id, elapsed_ms, error = %err, "Request failed");
        }
    }
    result
}
