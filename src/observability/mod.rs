//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Lifecycle and HTTP layers produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (processor failures, lifecycle state, shutdown time)
//!
//! Consumers:
//!     → Log aggregation (stdout, text or JSON)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```

pub mod logging;
pub mod metrics;
