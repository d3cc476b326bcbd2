//! Listener adapter contracts.
//!
//! The foundation owns the start/stop timing of its network listeners but
//! not their protocol. Production servers ([`crate::http::HttpServer`],
//! [`crate::grpc::GrpcServer`]) and test doubles plug in through these traits.

use async_trait::async_trait;
use tokio::net::TcpListener;
use tokio::time::Instant;

use crate::lifecycle::processor::BoxError;
use crate::net::listener::ListenerError;

/// Why a request listener's serving loop ended abnormally.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    /// The endpoint could not be acquired.
    #[error(transparent)]
    Bind(#[from] ListenerError),
    /// The serving loop failed after binding.
    #[error("serve loop failed: {0}")]
    Serve(#[source] BoxError),
}

/// Why a listener's graceful shutdown did not complete cleanly.
#[derive(Debug, thiserror::Error)]
pub enum ShutdownError {
    /// In-flight requests were still running at the deadline and were cut off.
    #[error("shutdown deadline exceeded; listener force closed")]
    DeadlineExceeded,
}

/// A request/response listener (HTTP).
#[async_trait]
pub trait RequestListener: Send + Sync {
    /// Configured bind address, for logging.
    fn address(&self) -> String;

    /// Bind and serve until shut down or failed.
    ///
    /// Returns `Ok(())` after a deliberate shutdown.
    async fn listen_and_serve(&self) -> Result<(), ServeError>;

    /// Drain in-flight requests until `deadline`, then force close.
    ///
    /// Returns [`ShutdownError::DeadlineExceeded`] if the drain did not finish
    /// in time. The listener is stopped when this returns either way.
    async fn shutdown(&self, deadline: Instant) -> Result<(), ShutdownError>;
}

/// An RPC listener (gRPC).
#[async_trait]
pub trait RpcListener: Send + Sync {
    /// Configured bind address; the foundation binds it before calling `serve`.
    fn address(&self) -> String;

    /// Serve on an already bound listener until stopped or failed.
    async fn serve(&self, listener: TcpListener) -> Result<(), BoxError>;

    /// Stop accepting and wait for in-flight calls to finish. No deadline.
    async fn graceful_stop(&self);
}
