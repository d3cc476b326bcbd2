//! Structured request logging.
//!
//! One span per request carrying the request ID, method, path and client IP,
//! and one completion event with status, latency, body size and content type.
//! Paths listed as skipped get neither.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::HttpBody;
use axum::extract::ConnectInfo;
use axum::http::{header, HeaderMap, Request, Response};
use tower_http::trace::{MakeSpan, OnResponse};
use tracing::Span;

use crate::http::middleware::X_REQUEST_ID;

/// Span factory and completion logger for `tower_http::trace::TraceLayer`.
#[derive(Debug, Clone, Default)]
pub struct RequestLogger {
    skip_paths: Arc<HashSet<String>>,
}

impl RequestLogger {
    pub fn new(skip_paths: impl IntoIterator<Item = String>) -> Self {
        Self {
            skip_paths: Arc::new(skip_paths.into_iter().collect()),
        }
    }

    pub fn skips(&self, path: &str) -> bool {
        self.skip_paths.contains(path)
    }
}

impl<B> MakeSpan<B> for RequestLogger {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        if self.skips(request.uri().path()) {
            return Span::none();
        }

        let request_id = request
            .headers()
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown");
        let path = request
            .uri()
            .path_and_query()
            .map(|p| p.as_str())
            .unwrap_or("/");
        let peer = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        let client_ip = client_ip(request.headers(), peer);

        tracing::info_span!(
            "http_request",
            request_id = %request_id,
            method = %request.method(),
            path = %path,
            client_ip = %client_ip,
        )
    }
}

impl<B: HttpBody> OnResponse<B> for RequestLogger {
    fn on_response(self, response: &Response<B>, latency: Duration, span: &Span) {
        if span.is_none() {
            return;
        }

        let status = response.status().as_u16();
        let latency_ms = latency.as_millis() as u64;
        let body_bytes = body_bytes(response);
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if response.status().is_server_error() {
            tracing::error!(parent: span, status, latency_ms, body_bytes, content_type, "Request failed");
        } else {
            tracing::info!(parent: span, status, latency_ms, body_bytes, content_type, "Request completed");
        }
    }
}

/// Response size from the body when known up front, else from `content-length`.
fn body_bytes<B: HttpBody>(response: &Response<B>) -> Option<u64> {
    response.body().size_hint().exact().or_else(|| {
        response
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
    })
}

/// First `x-forwarded-for` hop, then `x-real-ip`, then the socket peer.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    match (forwarded.or(real_ip), peer) {
        (Some(ip), _) => ip.to_string(),
        (None, Some(peer)) => peer.ip().to_string(),
        (None, None) => "unknown".to_string(),
    }
}
