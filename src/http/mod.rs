//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (bind, accept loop, hyper HTTP/1 connections, graceful drain)
//!     → middleware/ (request ID, request logging, panic recovery, basic auth, HTTPS redirect)
//!     → application routes (handlers.rs provides /status)
//! ```

pub mod handlers;
pub mod middleware;
pub mod server;

pub use server::{HttpServer, HttpSettings};
