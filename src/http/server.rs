//! HTTP server setup and lifecycle.
//!
//! # Responsibilities
//! - Wrap the application's Axum Router with the standard middleware stack
//!   (request ID, request logging, panic recovery, request timeout)
//! - Accept connections and serve each one with hyper's HTTP/1 connection
//!   driver, bounded by the header read and idle timeouts
//! - Drain in-flight requests on shutdown, aborting open connections at the deadline
//!
//! # Design Decisions
//! - Connections are owned by a [`ConnectionTracker`], so a force close
//!   really closes the sockets instead of leaving detached tasks behind
//! - hyper's header read timer also runs while a keep-alive connection
//!   waits for its next request, so an idle connection is closed after
//!   the shorter of `read_timeout` and `idle_timeout`

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use axum::{middleware, Router};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::net::TcpStream;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::options::{DEFAULT_IDLE_TIMEOUT, DEFAULT_READ_TIMEOUT, DEFAULT_WRITE_TIMEOUT};
use crate::config::FoundationOptions;
use crate::http::middleware::{recovery, request_id, MakeRequestUuidV4, RequestLogger};
use crate::net::adapter::{RequestListener, ServeError, ShutdownError};
use crate::net::connection::{ConnectionId, ConnectionTracker, RequestActivity};
use crate::net::listener;

/// Per-server timeouts and request logging settings.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpSettings {
    /// Bounds every request end to end. Expiry answers 408.
    pub request_timeout: Duration,
    /// Time allowed to receive a complete request head.
    pub read_timeout: Duration,
    /// Keep-alive connections with no request in flight are closed after this.
    pub idle_timeout: Duration,
    /// Paths that never get a completion log line.
    pub log_skip_paths: Vec<String>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_WRITE_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            log_skip_paths: Vec::new(),
        }
    }
}

impl HttpSettings {
    pub fn from_options(options: &FoundationOptions) -> Self {
        Self {
            request_timeout: options.write_timeout,
            read_timeout: options.read_timeout,
            idle_timeout: options.idle_timeout,
            log_skip_paths: options.log_skip_paths.clone(),
        }
    }
}

/// HTTP server driven by the foundation through [`RequestListener`].
pub struct HttpServer {
    address: String,
    router: Router,
    read_timeout: Duration,
    idle_timeout: Duration,
    /// Stop accepting and drain.
    graceful: CancellationToken,
    /// Abort every open connection without waiting for in-flight requests.
    force_close: CancellationToken,
    /// Cancelled once `listen_and_serve` has returned.
    stopped: CancellationToken,
    started: AtomicBool,
}

impl HttpServer {
    /// Create a server for `router` on `address` (e.g. "0.0.0.0:8080").
    pub fn new(address: impl Into<String>, router: Router, settings: HttpSettings) -> Self {
        Self {
            address: address.into(),
            router: Self::build_router(router, &settings),
            read_timeout: settings.read_timeout,
            idle_timeout: settings.idle_timeout,
            graceful: CancellationToken::new(),
            force_close: CancellationToken::new(),
            stopped: CancellationToken::new(),
            started: AtomicBool::new(false),
        }
    }

    /// Create a server from resolved foundation options.
    pub fn from_options(router: Router, options: &FoundationOptions) -> Self {
        Self::new(
            options.http.bind_address.clone(),
            router,
            HttpSettings::from_options(options),
        )
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(router: Router, settings: &HttpSettings) -> Router {
        let logger = RequestLogger::new(settings.log_skip_paths.iter().cloned());

        router
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                settings.request_timeout,
            ))
            .layer(CatchPanicLayer::custom(recovery::handle_panic))
            .layer(middleware::from_fn(request_id::scope_request_id))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(logger.clone())
                    .on_response(logger),
            )
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV4))
    }

    /// Serve one accepted connection until it closes.
    fn connection_task(
        &self,
        stream: TcpStream,
        remote: SocketAddr,
        id: ConnectionId,
    ) -> impl std::future::Future<Output = ()> + Send + 'static {
        let router = self.router.clone();
        let graceful = self.graceful.clone();
        let idle_timeout = self.idle_timeout;
        let activity = RequestActivity::new();

        let mut builder = http1::Builder::new();
        builder
            .timer(TokioTimer::new())
            .header_read_timeout(self.read_timeout)
            .keep_alive(true);

        let requests = activity.clone();
        let service = hyper::service::service_fn(move |mut request: Request<Incoming>| {
            request.extensions_mut().insert(ConnectInfo(remote));
            let guard = requests.begin();
            let router = router.clone();
            async move {
                let response = router.oneshot(request.map(Body::new)).await;
                drop(guard);
                response
            }
        });

        async move {
            let connection = builder.serve_connection(TokioIo::new(stream), service);
            tokio::pin!(connection);

            let mut closing = false;
            loop {
                let reason = tokio::select! {
                    result = connection.as_mut() => {
                        if let Err(error) = result {
                            tracing::debug!(connection_id = %id, error = %error, "Connection ended with error");
                        }
                        return;
                    }
                    _ = graceful.cancelled(), if !closing => "server shutdown",
                    _ = activity.idle_for(idle_timeout), if !closing => "idle timeout",
                };

                tracing::trace!(connection_id = %id, reason, "Closing connection");
                closing = true;
                connection.as_mut().graceful_shutdown();
            }
        }
    }
}

#[async_trait]
impl RequestListener for HttpServer {
    fn address(&self) -> String {
        self.address.clone()
    }

    async fn listen_and_serve(&self) -> Result<(), ServeError> {
        self.started.store(true, Ordering::SeqCst);
        let _stopped = self.stopped.clone().drop_guard();

        let listener = listener::bind(&self.address).await?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| ServeError::Serve(e.into()))?;
        tracing::info!(address = %local_addr, "HTTP server listening");

        let mut connections = ConnectionTracker::new();
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote)) => {
                        connections.reap();
                        let id = ConnectionId::next();
                        tracing::trace!(connection_id = %id, remote = %remote, "Connection accepted");
                        connections.spawn(id, self.connection_task(stream, remote, id));
                    }
                    Err(error) => {
                        tracing::warn!(error = %error, "Failed to accept connection");
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                },
                _ = self.graceful.cancelled() => break,
            }
        }
        drop(listener);

        let forced = tokio::select! {
            _ = connections.drained() => false,
            _ = self.force_close.cancelled() => true,
        };
        if forced {
            let open = connections.abort_all().await;
            tracing::warn!(address = %local_addr, open, "HTTP server force closed");
        }

        tracing::info!(address = %local_addr, "HTTP server stopped");
        Ok(())
    }

    async fn shutdown(&self, deadline: Instant) -> Result<(), ShutdownError> {
        self.graceful.cancel();
        if !self.started.load(Ordering::SeqCst) {
            return Ok(());
        }

        if tokio::time::timeout_at(deadline, self.stopped.cancelled())
            .await
            .is_ok()
        {
            return Ok(());
        }

        tracing::warn!(
            address = %self.address,
            "HTTP server did not drain before the deadline, forcing close"
        );
        self.force_close.cancel();
        self.stopped.cancelled().await;
        Err(ShutdownError::DeadlineExceeded)
    }
}
