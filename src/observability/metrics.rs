//! Lifecycle metrics.
//!
//! # Metrics
//! - `foundation_processor_failures_total` (counter): failures by phase (start, stop)
//! - `foundation_lifecycle_state` (gauge): 0=created, 1=running, 2=draining, 3=stopped
//! - `foundation_shutdown_duration_seconds` (histogram): time from cancellation to stopped
//!
//! Recording is a no-op until a recorder is installed with [`init_metrics`].

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::lifecycle::LifecycleState;

/// Install the Prometheus recorder and expose it on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_processor_failures(phase: &'static str, count: usize) {
    counter!("foundation_processor_failures_total", "phase" => phase).increment(count as u64);
}

pub fn record_state(state: LifecycleState) {
    gauge!("foundation_lifecycle_state").set(state as u8 as f64);
}

pub fn record_shutdown_duration(started: Instant) {
    histogram!("foundation_shutdown_duration_seconds").record(started.elapsed().as_secs_f64());
}
