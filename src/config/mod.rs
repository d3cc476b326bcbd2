//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (JSON/TOML) or inline JSON
//!     → loader.rs (parse, layer over defaults)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → options.rs (FoundationOptions for the orchestrator)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod environment;
pub mod loader;
pub mod options;
pub mod schema;
pub mod validation;

pub use environment::Environment;
pub use loader::{load_config, load_from_file, load_from_str, ConfigError};
pub use options::{FoundationOptions, ListenerOptions};
pub use schema::{AppConfig, ServerConfig};
