//! Service foundation library.
//!
//! Bootstraps small backend services: configuration loading, structured
//! logging, an HTTP server, a gRPC server, and a lifecycle orchestrator that
//! runs background processors and drains everything on shutdown.

pub mod config;
pub mod grpc;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::{AppConfig, FoundationOptions};
pub use http::HttpServer;
pub use lifecycle::{Foundation, FoundationError, LifecycleState, Processor, StopHandle};
