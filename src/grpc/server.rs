//! gRPC server driven by the foundation through [`RpcListener`].

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tonic::service::interceptor;
use tonic::service::Routes;
use tonic::transport::server::TcpIncoming;
use tonic::transport::Server;

use crate::grpc::interceptor::SharedInterceptor;
use crate::lifecycle::processor::BoxError;
use crate::net::adapter::RpcListener;

/// Tonic server for a fixed set of routes.
pub struct GrpcServer {
    address: String,
    routes: Routes,
    interceptor: SharedInterceptor,
    shutdown: CancellationToken,
    /// Cancelled once `serve` has returned.
    stopped: CancellationToken,
    serving: AtomicBool,
}

impl GrpcServer {
    pub fn new(address: impl Into<String>, routes: Routes) -> Self {
        Self {
            address: address.into(),
            routes,
            interceptor: SharedInterceptor::pass_through(),
            shutdown: CancellationToken::new(),
            stopped: CancellationToken::new(),
            serving: AtomicBool::new(false),
        }
    }

    /// Run `interceptor` on every call before it reaches a service.
    pub fn with_interceptor(mut self, interceptor: SharedInterceptor) -> Self {
        self.interceptor = interceptor;
        self
    }
}

#[async_trait]
impl RpcListener for GrpcServer {
    fn address(&self) -> String {
        self.address.clone()
    }

    async fn serve(&self, listener: TcpListener) -> Result<(), BoxError> {
        self.serving.store(true, Ordering::SeqCst);
        let _stopped = self.stopped.clone().drop_guard();

        let local_addr = listener.local_addr()?;
        let incoming = TcpIncoming::from_listener(listener, true, None)?;
        tracing::info!(address = %local_addr, "gRPC server listening");

        Server::builder()
            .layer(interceptor(self.interceptor.clone()))
            .add_routes(self.routes.clone())
            .serve_with_incoming_shutdown(incoming, self.shutdown.clone().cancelled_owned())
            .await?;

        tracing::info!(address = %local_addr, "gRPC server stopped");
        Ok(())
    }

    async fn graceful_stop(&self) {
        self.shutdown.cancel();
        if self.serving.load(Ordering::SeqCst) {
            self.stopped.cancelled().await;
        }
    }
}
