//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs, foundation.rs):
//!     Start processors in order → bind gRPC → bind HTTP → wait for cancellation
//!
//! Shutdown (shutdown.rs, foundation.rs):
//!     Token cancelled → stop processors concurrently → gRPC graceful stop
//!     → HTTP drain until deadline → Stopped
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → cancel the run token
//! ```
//!
//! # Design Decisions
//! - Processors stop before listeners so they can finish talking through them
//! - Cancellation is the only shutdown trigger
//! - Listener bind failures are fatal (fatal.rs), serve failures cancel the service
//! - Shutdown has a deadline: the HTTP listener is force closed after it

pub mod fatal;
pub mod foundation;
pub mod processor;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use fatal::{ExitProcess, FatalError, FatalHandler};
pub use foundation::{Foundation, FoundationError, LifecycleState};
pub use processor::{BoxError, Processor, ProcessorFailure};
pub use shutdown::{stop_all, StopGroup, StopHandle};
pub use startup::start_all;
