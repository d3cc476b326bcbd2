//! TCP listener binding.
//!
//! # Responsibilities
//! - Resolve and bind the configured address
//! - Report bind failures with a typed error

use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Error type for listener operations.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    /// The configured address could not be parsed.
    #[error("invalid bind address {address}: {source}")]
    Address {
        address: String,
        #[source]
        source: std::net::AddrParseError,
    },
    /// Failed to bind to address.
    #[error("failed to bind: {0}")]
    Bind(#[source] std::io::Error),
}

/// Bind a TCP listener on `address` (e.g. `"0.0.0.0:8080"`).
pub async fn bind(address: &str) -> Result<TcpListener, ListenerError> {
    let addr: SocketAddr = address.parse().map_err(|source| ListenerError::Address {
        address: address.to_string(),
        source,
    })?;

    let listener = TcpListener::bind(addr).await.map_err(ListenerError::Bind)?;
    let local_addr = listener.local_addr().map_err(ListenerError::Bind)?;

    tracing::info!(address = %local_addr, "Listener bound");
    Ok(listener)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_unparseable_address() {
        let err = bind("not-an-address").await.unwrap_err();
        assert!(matches!(err, ListenerError::Address { .. }));
    }

    #[tokio::test]
    async fn reports_port_already_in_use() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = taken.local_addr().unwrap().to_string();

        let err = bind(&address).await.unwrap_err();
        assert!(matches!(err, ListenerError::Bind(_)));
    }
}
