//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Pick a verbosity preset from the environment
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production-like environments, text for development and test
//! - `RUST_LOG` overrides the preset

use std::future::Future;
use std::time::Instant;

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::Environment;

/// Default filter directive for an environment.
pub fn default_directive(environment: Environment) -> &'static str {
    match environment {
        Environment::Development => "debug",
        Environment::Test => "warn",
        _ => "info",
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(environment: Environment) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(environment)));

    let format = if environment.is_debug() {
        fmt::layer().with_target(true).boxed()
    } else {
        fmt::layer()
            .json()
            .with_current_span(true)
            .flatten_event(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(format)
        .with(filter)
        .try_init()
}

/// Await `future` and log how long it took under `label`.
pub async fn log_execution_time<F: Future>(label: &str, future: F) -> F::Output {
    let started = Instant::now();
    let output = future.await;
    tracing::info!(
        method = label,
        execution_time_ms = started.elapsed().as_millis() as u64,
        "Execution finished"
    );
    output
}
