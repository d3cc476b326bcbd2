//! Fatal error handling.
//!
//! A listener that cannot bind means the service cannot run as configured.
//! The foundation hands such errors to a [`FatalHandler`]; the default one
//! logs and terminates the process with a nonzero exit code.

use crate::net::listener::ListenerError;

/// Errors that end the process instead of the run call.
#[derive(Debug, thiserror::Error)]
pub enum FatalError {
    #[error("http listener on {address} failed to start: {source}")]
    HttpBind {
        address: String,
        #[source]
        source: ListenerError,
    },
    #[error("grpc listener on {address} failed to start: {source}")]
    GrpcBind {
        address: String,
        #[source]
        source: ListenerError,
    },
}

/// Receives fatal errors raised by the foundation's listener tasks.
pub trait FatalHandler: Send + Sync {
    fn fatal(&self, error: FatalError);
}

/// Default handler: log at error level and exit with status 1.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExitProcess;

impl FatalHandler for ExitProcess {
    fn fatal(&self, error: FatalError) {
        tracing::error!(error = %error, "Fatal error, exiting");
        std::process::exit(1);
    }
}
