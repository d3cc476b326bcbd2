use axum::{routing::get, Json, Router};
use serde::Serialize;

#[derive(Serialize)]
pub struct Status {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn get_status() -> Json<Status> {
    Json(Status {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Unauthenticated routes every service exposes.
pub fn status_router() -> Router {
    Router::new().route("/status", get(get_status))
}
