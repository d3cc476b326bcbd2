//! HTTP Basic authentication middleware.
//!
//! Checks credentials against a static user table. Development environments
//! skip the check entirely.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::config::Environment;

const CHALLENGE: &str = r#"Basic realm="Give username and password""#;

/// Basic auth settings shared by every request.
#[derive(Debug, Clone)]
pub struct BasicAuth {
    environment: Environment,
    users: Arc<HashMap<String, String>>,
}

impl BasicAuth {
    pub fn new(environment: Environment, users: HashMap<String, String>) -> Self {
        Self {
            environment,
            users: Arc::new(users),
        }
    }

    /// Wrap every route of `router` with the check.
    pub fn protect(self, router: Router) -> Router {
        router.layer(middleware::from_fn_with_state(self, basic_auth_middleware))
    }

    fn is_authorised(&self, username: &str, password: &str) -> bool {
        self.users
            .get(username)
            .is_some_and(|expected| expected == password)
    }
}

pub async fn basic_auth_middleware(
    State(auth): State<BasicAuth>,
    request: Request,
    next: Next,
) -> Response {
    if auth.environment == Environment::Development {
        return next.run(request).await;
    }

    let credentials = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(parse_basic);

    let Some((username, password)) = credentials else {
        tracing::warn!("No basic auth present");
        return unauthorised();
    };

    if !auth.is_authorised(&username, &password) {
        tracing::warn!(username = %username, "Incorrect basic auth present");
        return unauthorised();
    }

    tracing::debug!(username = %username, "Basic auth successful");
    next.run(request).await
}

/// Decode an `Authorization: Basic ...` header value into username and password.
fn parse_basic(value: &str) -> Option<(String, String)> {
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

fn unauthorised() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, CHALLENGE)],
        Json(serde_json::json!({ "message": "No basic auth present" })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_header() {
        let header = format!("Basic {}", STANDARD.encode("ops:s3cret"));
        assert_eq!(
            parse_basic(&header),
            Some(("ops".to_string(), "s3cret".to_string()))
        );
    }

    #[test]
    fn rejects_other_schemes_and_garbage() {
        assert_eq!(parse_basic("Bearer token"), None);
        assert_eq!(parse_basic("Basic !!!"), None);
        assert_eq!(parse_basic(&format!("Basic {}", STANDARD.encode("nocolon"))), None);
    }

    #[test]
    fn checks_password_for_known_user() {
        let auth = BasicAuth::new(
            Environment::Production,
            HashMap::from([("ops".to_string(), "s3cret".to_string())]),
        );
        assert!(auth.is_authorised("ops", "s3cret"));
        assert!(!auth.is_authorised("ops", "wrong"));
        assert!(!auth.is_authorised("nobody", "s3cret"));
    }
}
