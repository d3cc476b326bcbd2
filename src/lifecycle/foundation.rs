//! The service foundation: processors, listeners and the run loop.
//!
//! # Lifecycle
//! ```text
//! Created ──run()──▶ Running ──token cancelled──▶ Draining ──drain done──▶ Stopped
//! ```
//!
//! Startup: processors (ordered) → gRPC listener → HTTP listener → wait.
//! Shutdown: processors (concurrent) → gRPC graceful stop → HTTP drain with deadline.

use std::sync::Arc;
use std::time::Instant as StdInstant;

use axum::Router;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tonic::service::RoutesBuilder;

use crate::config::FoundationOptions;
use crate::grpc::{GrpcServer, SharedInterceptor};
use crate::http::HttpServer;
use crate::lifecycle::fatal::{ExitProcess, FatalError, FatalHandler};
use crate::lifecycle::processor::{Processor, ProcessorFailure};
use crate::lifecycle::shutdown::{stop_all, StopGroup};
use crate::lifecycle::signals;
use crate::lifecycle::startup::start_all;
use crate::net::adapter::{RequestListener, RpcListener, ServeError, ShutdownError};
use crate::net::listener;
use crate::observability::logging::log_execution_time;
use crate::observability::metrics;

/// Orchestrator state. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LifecycleState {
    Created = 0,
    Running = 1,
    Draining = 2,
    Stopped = 3,
}

/// Errors returned from [`Foundation::run`].
#[derive(Debug, thiserror::Error)]
pub enum FoundationError {
    /// Strict start policy is on and at least one processor failed to start.
    #[error("failed to start {} processor(s) and stop_on_processor_start_failure is set", .0.len())]
    ProcessorStart(Vec<ProcessorFailure>),
    /// The HTTP listener did not shut down cleanly.
    #[error("http server shutdown failed: {0}")]
    HttpShutdown(#[source] ShutdownError),
}

/// Owns a service's background processors and network listeners and runs
/// them from startup to a bounded, ordered shutdown.
pub struct Foundation {
    options: FoundationOptions,
    processors: Vec<Arc<dyn Processor>>,
    http_router: Router,
    grpc_routes: RoutesBuilder,
    grpc_interceptor: SharedInterceptor,
    request_listener: Option<Arc<dyn RequestListener>>,
    rpc_listener: Option<Arc<dyn RpcListener>>,
    fatal: Arc<dyn FatalHandler>,
    state: watch::Sender<LifecycleState>,
}

impl Foundation {
    /// Create a foundation. Nothing starts until [`Foundation::run`].
    pub fn new(options: FoundationOptions) -> Self {
        let (state, _) = watch::channel(LifecycleState::Created);
        Self {
            options: options.values_or_defaults(),
            processors: Vec::new(),
            http_router: Router::new(),
            grpc_routes: RoutesBuilder::default(),
            grpc_interceptor: SharedInterceptor::pass_through(),
            request_listener: None,
            rpc_listener: None,
            fatal: Arc::new(ExitProcess),
            state,
        }
    }

    pub fn options(&self) -> &FoundationOptions {
        &self.options
    }

    /// Register a processor. Processors start in registration order.
    pub fn add_processor<P: Processor + 'static>(&mut self, processor: P) {
        self.processors.push(Arc::new(processor));
    }

    /// Register a shared processor.
    pub fn add_shared_processor(&mut self, processor: Arc<dyn Processor>) {
        self.processors.push(processor);
    }

    /// Merge routes into the HTTP router served when the HTTP listener is enabled.
    pub fn http_router(&mut self, router: Router) {
        let current = std::mem::take(&mut self.http_router);
        self.http_router = current.merge(router);
    }

    /// gRPC services served when the gRPC listener is enabled.
    pub fn grpc_routes_mut(&mut self) -> &mut RoutesBuilder {
        &mut self.grpc_routes
    }

    /// Interceptor run on every call to the built-in gRPC server.
    pub fn grpc_interceptor(&mut self, interceptor: SharedInterceptor) {
        self.grpc_interceptor = interceptor;
    }

    /// Use a custom request listener instead of the built-in HTTP server.
    /// It is run regardless of `options.http.enabled`.
    pub fn with_request_listener(mut self, listener: Arc<dyn RequestListener>) -> Self {
        self.request_listener = Some(listener);
        self
    }

    /// Use a custom RPC listener instead of the built-in gRPC server.
    /// It is run regardless of `options.grpc.enabled`.
    pub fn with_rpc_listener(mut self, listener: Arc<dyn RpcListener>) -> Self {
        self.rpc_listener = Some(listener);
        self
    }

    /// Replace the handler invoked when a listener cannot bind.
    pub fn with_fatal_handler(mut self, handler: Arc<dyn FatalHandler>) -> Self {
        self.fatal = handler;
        self
    }

    /// Watch lifecycle state transitions.
    pub fn state(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Run until SIGINT/SIGTERM, then drain.
    pub async fn run_until_signal(self) -> Result<(), FoundationError> {
        let token = signals::context_with_cancel();
        self.run(token).await
    }

    /// Start everything, wait for `token` to be cancelled, then drain.
    ///
    /// Consumes the foundation; a stopped foundation cannot be restarted.
    pub async fn run(mut self, token: CancellationToken) -> Result<(), FoundationError> {
        self.transition(LifecycleState::Running);

        let failures = start_all(&self.processors).await;
        if !failures.is_empty() {
            if self.options.stop_on_processor_start_failure {
                tracing::error!(
                    failed = failures.len(),
                    "Failed to start one or more processors, stop_on_processor_start_failure is set"
                );
                self.transition(LifecycleState::Stopped);
                return Err(FoundationError::ProcessorStart(failures));
            }
            tracing::warn!(
                failed = failures.len(),
                "Continuing with one or more processors that failed to start"
            );
        }

        let rpc = self.take_rpc_listener();
        let rpc_task = rpc
            .clone()
            .map(|rpc| spawn_rpc(rpc, token.clone(), Arc::clone(&self.fatal)));

        let http = self.take_request_listener();
        let http_task = http
            .clone()
            .map(|http| spawn_http(http, token.clone(), Arc::clone(&self.fatal)));

        token.cancelled().await;
        let drain_started = StdInstant::now();
        self.transition(LifecycleState::Draining);
        tracing::info!("Shutting down");

        let failures =
            log_execution_time("stop_processors", stop_all(&self.processors, StopGroup::new()))
                .await;
        if !failures.is_empty() {
            let errors = failures.iter().map(ToString::to_string).collect::<Vec<_>>();
            tracing::warn!(
                ?errors,
                "Failed to gracefully stop one or more processors"
            );
        }

        let deadline = Instant::now() + self.options.shutdown_wait;

        if let Some(rpc) = rpc {
            tracing::info!(address = %rpc.address(), "Shutting down gRPC server");
            rpc.graceful_stop().await;
            if let Some(task) = rpc_task {
                if let Err(error) = task.await {
                    tracing::warn!(error = %error, "gRPC server task panicked");
                }
            }
        }

        let mut outcome = Ok(());
        if let Some(http) = http {
            tracing::info!(address = %http.address(), "Shutting down HTTP server");
            outcome = http.shutdown(deadline).await.map_err(FoundationError::HttpShutdown);
            if let Some(task) = http_task {
                join_until(task, deadline, "HTTP").await;
            }
        }

        self.transition(LifecycleState::Stopped);
        metrics::record_shutdown_duration(drain_started);
        match &outcome {
            Ok(()) => tracing::info!("Foundation stopped"),
            Err(error) => tracing::error!(error = %error, "Foundation stopped with error"),
        }
        outcome
    }

    fn take_request_listener(&mut self) -> Option<Arc<dyn RequestListener>> {
        if let Some(listener) = self.request_listener.take() {
            return Some(listener);
        }
        if !self.options.http.enabled {
            return None;
        }
        let router = std::mem::take(&mut self.http_router);
        Some(Arc::new(HttpServer::from_options(router, &self.options)))
    }

    fn take_rpc_listener(&mut self) -> Option<Arc<dyn RpcListener>> {
        if let Some(listener) = self.rpc_listener.take() {
            return Some(listener);
        }
        if !self.options.grpc.enabled {
            return None;
        }
        let routes = std::mem::take(&mut self.grpc_routes).routes();
        let interceptor = std::mem::take(&mut self.grpc_interceptor);
        Some(Arc::new(
            GrpcServer::new(self.options.grpc.bind_address.clone(), routes)
                .with_interceptor(interceptor),
        ))
    }

    fn transition(&self, next: LifecycleState) {
        let previous = self.state.send_replace(next);
        metrics::record_state(next);
        tracing::debug!(from = ?previous, to = ?next, "Lifecycle transition");
    }
}

fn spawn_rpc(
    rpc: Arc<dyn RpcListener>,
    token: CancellationToken,
    fatal: Arc<dyn FatalHandler>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let address = rpc.address();
        tracing::info!(address = %address, "gRPC server starting");

        let bound = match listener::bind(&address).await {
            Ok(bound) => bound,
            Err(source) => {
                fatal.fatal(FatalError::GrpcBind { address, source });
                return;
            }
        };

        match rpc.serve(bound).await {
            _ if token.is_cancelled() => {}
            Ok(()) => {
                tracing::error!(address = %address, "gRPC server exited unexpectedly");
                token.cancel();
            }
            Err(error) => {
                tracing::error!(address = %address, error = %error, "gRPC server failed, shutting down");
                token.cancel();
            }
        }
    })
}

fn spawn_http(
    http: Arc<dyn RequestListener>,
    token: CancellationToken,
    fatal: Arc<dyn FatalHandler>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let address = http.address();
        tracing::info!(address = %address, "HTTP server starting");

        match http.listen_and_serve().await {
            Err(ServeError::Bind(source)) => {
                fatal.fatal(FatalError::HttpBind { address, source });
            }
            // Deliberate shutdown.
            _ if token.is_cancelled() => {}
            Ok(()) => {
                tracing::error!(address = %address, "HTTP server exited unexpectedly");
                token.cancel();
            }
            Err(error) => {
                tracing::error!(address = %address, error = %error, "HTTP server failed, shutting down");
                token.cancel();
            }
        }
    })
}

/// Await a listener task until `deadline`, aborting it if it is still running.
async fn join_until(mut task: JoinHandle<()>, deadline: Instant, name: &str) {
    match tokio::time::timeout_at(deadline, &mut task).await {
        Ok(Ok(())) => {}
        Ok(Err(error)) => tracing::warn!(listener = name, error = %error, "Listener task panicked"),
        Err(_) => {
            tracing::warn!(listener = name, "Listener task still running at deadline, aborting");
            task.abort();
        }
    }
}
