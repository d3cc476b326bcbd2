//! HTTPS redirect for production.
//!
//! TLS terminates at the load balancer, so a request counts as secure when
//! `x-forwarded-proto` says `https`. Anything else is answered with a
//! permanent redirect to the same host and path over HTTPS.

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};

use crate::config::Environment;

pub const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

#[derive(Debug, Clone, Copy)]
pub struct ForceSsl {
    environment: Environment,
}

impl ForceSsl {
    pub fn new(environment: Environment) -> Self {
        Self { environment }
    }

    /// Wrap every route of `router` with the redirect.
    pub fn protect(self, router: Router) -> Router {
        router.layer(middleware::from_fn_with_state(self, force_ssl_middleware))
    }
}

pub async fn force_ssl_middleware(
    State(force): State<ForceSsl>,
    request: Request,
    next: Next,
) -> Response {
    if force.environment != Environment::Production || is_forwarded_https(&request) {
        return next.run(request).await;
    }

    match https_location(&request) {
        Some(location) => {
            tracing::debug!(location = ?location, "Redirecting to HTTPS");
            (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response()
        }
        None => {
            tracing::warn!("Cannot build HTTPS redirect without a host");
            StatusCode::BAD_REQUEST.into_response()
        }
    }
}

fn is_forwarded_https(request: &Request) -> bool {
    request
        .headers()
        .get(X_FORWARDED_PROTO)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|proto| proto.eq_ignore_ascii_case("https"))
}

fn https_location(request: &Request) -> Option<HeaderValue> {
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| request.uri().authority().map(|a| a.as_str()))?;
    let path = request
        .uri()
        .path_and_query()
        .map(|p| p.as_str())
        .unwrap_or("/");

    HeaderValue::from_str(&format!("https://{}{}", host, path)).ok()
}
