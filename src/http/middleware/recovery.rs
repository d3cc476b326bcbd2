//! Panic recovery for HTTP handlers.

use std::any::Any;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::http::middleware::request_id;

/// Message returned to clients when a handler panics.
pub const PUBLIC_ERROR: &str = "An internal error has occurred. Contact support for more information";

/// Panic handler for `tower_http::catch_panic::CatchPanicLayer::custom`.
///
/// Logs the panic payload and answers 500 with a generic JSON error that
/// carries the request ID, so the client can quote it to support.
pub fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else {
        "unknown panic payload"
    };
    let request_id = request_id::current().unwrap_or_default();

    tracing::error!(panic = %detail, request_id = %request_id, "Panic occurred and recovered");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": PUBLIC_ERROR, "request_id": request_id })),
    )
        .into_response()
}
