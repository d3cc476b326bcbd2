//! OS signal handling.
//!
//! # Responsibilities
//! - Listen for SIGINT and SIGTERM
//! - Translate the first one into cancellation of the run token
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Cancellation is level-triggered; later signals are no-ops

use tokio_util::sync::CancellationToken;

/// Create a fresh run token that is cancelled on SIGINT or SIGTERM.
///
/// Must be called from within a Tokio runtime.
pub fn context_with_cancel() -> CancellationToken {
    let token = CancellationToken::new();
    cancel_on_signal(token.clone());
    token
}

/// Cancel `token` when the process receives SIGINT or SIGTERM.
pub fn cancel_on_signal(token: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            signal = stop_signal() => {
                tracing::info!(signal, "Stop signal received");
                token.cancel();
            }
            _ = token.cancelled() => {}
        }
    });
}

#[cfg(unix)]
async fn stop_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(error) => {
            tracing::warn!(error = %error, "Unable to install SIGTERM handler");
            return ctrl_c().await;
        }
    };

    tokio::select! {
        name = ctrl_c() => name,
        _ = terminate.recv() => "SIGTERM",
    }
}

#[cfg(not(unix))]
async fn stop_signal() -> &'static str {
    ctrl_c().await
}

async fn ctrl_c() -> &'static str {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %error, "Unable to listen for SIGINT");
        std::future::pending::<()>().await;
    }
    "SIGINT"
}
