//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Configured address
//!     → listener.rs (parse, bind, typed bind errors)
//!     → adapter.rs (RequestListener / RpcListener contracts)
//!     → Hand off to the HTTP or gRPC server
//!     → connection.rs (per-connection tasks, in-flight request counts)
//! ```

pub mod adapter;
pub mod connection;
pub mod listener;

pub use adapter::{RequestListener, RpcListener, ServeError, ShutdownError};
pub use listener::ListenerError;
