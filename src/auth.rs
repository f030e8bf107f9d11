//! HTTP Basic Authentication for admin routes

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, Response, StatusCode},
    middleware::Next,
    response::IntoResponse,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;

/// Admin credentials for the export/import routes
#[derive(Debug, Clone)]
pub struct AdminAuth {
    /// Username (None = auth disabled)
    pub username: Option<String>,
    pub password: Option<String>,
}

impl AdminAuth {
    /// ADMIN_USERNAME and ADMIN_PASSWORD must both be set to enable auth
    pub fn from_env() -> Self {
        let username = std::env::var("ADMIN_USERNAME")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let password = std::env::var("ADMIN_PASSWORD")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        if username.is_some() && password.is_some() {
            tracing::info!("Admin authentication enabled");
            Self { username, password }
        } else {
            if username.is_some() || password.is_some() {
                tracing::warn!(
                    "ADMIN_USERNAME and ADMIN_PASSWORD must both be set to enable authentication"
                );
            }
            tracing::warn!("Admin authentication DISABLED - anyone can export progress!");
            Self::disabled()
        }
    }

    pub fn disabled() -> Self {
        Self {
            username: None,
            password: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

    pub fn validate(&self, username: &str, password: &str) -> bool {
        match (&self.username, &self.password) {
            (Some(u), Some(p)) => {
                constant_time_eq(u.as_bytes(), username.as_bytes())
                    && constant_time_eq(p.as_bytes(), password.as_bytes())
            }
            _ => true,
        }
    }

    /// Check an `Authorization: Basic ...` header value
    fn accepts_header(&self, value: &str) -> bool {
        let Some(credentials) = value.strip_prefix("Basic ") else {
            return false;
        };
        let Ok(decoded) = STANDARD.decode(credentials.trim()) else {
            return false;
        };
        let Ok(decoded) = String::from_utf8(decoded) else {
            return false;
        };
        match decoded.split_once(':') {
            Some((username, password)) => self.validate(username, password),
            None => false,
        }
    }
}

/// Constant-time byte comparison, also used for the device unlock PIN
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

/// Middleware for HTTP Basic Authentication on admin routes
pub async fn admin_auth_middleware(
    State(auth): State<Arc<AdminAuth>>,
    request: Request<Body>,
    next: Next,
) -> Response<Body> {
    if !auth.is_enabled() {
        return next.run(request).await;
    }

    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| auth.accepts_header(v));
    if authorized {
        return next.run(request).await;
    }

    tracing::warn!(path = %request.uri().path(), "Rejected admin request");
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Basic realm=\"Mystery Room Admin\"")],
        "Unauthorized",
    )
        .into_response()
}
