//! HTTP middleware.
//!
//! Each middleware is an independent request interceptor with no shared
//! state beyond its own configuration.

pub mod basic_auth;
pub mod force_ssl;
pub mod logger;
pub mod recovery;
pub mod request_id;

pub use basic_auth::BasicAuth;
pub use force_ssl::ForceSsl;
pub use logger::RequestLogger;
pub use request_id::{MakeRequestUuidV4, X_REQUEST_ID};
