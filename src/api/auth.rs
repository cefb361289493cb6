//! Actor identity for the API.
//!
//! Two credential paths, checked in order:
//! - `X-API-Key` for service-account / bot access, compared against the
//!   configured key in constant time.
//! - `Authorization: Bearer <id token>` verified against the identity
//!   provider's tokeninfo endpoint; the token audience must match the
//!   configured client id and the email must be on the allow-list.
//!
//! `DEV_MODE=true` bypasses both and injects a dev actor.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::routes::AppState;
use super::types::ErrorBody;
use crate::config::AuthConfig;

/// The authenticated actor, inserted as a request extension.
#[derive(Debug, Clone, Serialize)]
pub struct AuthUser {
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

/// Verifies ID tokens against the identity provider.
pub struct IdentityVerifier {
    http: reqwest::Client,
    client_id: String,
    tokeninfo_url: String,
}

/// Fields we need from the tokeninfo response.
#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: String,
    email: String,
    name: Option<String>,
    picture: Option<String>,
}

impl IdentityVerifier {
    pub fn new(auth: &AuthConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id: auth.google_client_id.clone(),
            tokeninfo_url: auth.tokeninfo_url.clone(),
        }
    }

    /// Verify an ID token, returning the actor identity on success.
    pub async fn verify(&self, token: &str) -> anyhow::Result<AuthUser> {
        let resp = self
            .http
            .get(&self.tokeninfo_url)
            .query(&[("id_token", token)])
            .send()
            .await?;
        if !resp.status().is_success() {
            anyhow::bail!("token rejected by identity provider");
        }
        let info: TokenInfo = resp.json().await?;
        if info.aud != self.client_id {
            anyhow::bail!("token audience mismatch");
        }
        Ok(AuthUser {
            email: info.email,
            name: info.name,
            picture: info.picture,
        })
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();
    if a_bytes.len() != b_bytes.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for i in 0..a_bytes.len() {
        diff |= a_bytes[i] ^ b_bytes[i];
    }
    diff == 0
}

fn unauthorized(message: impl Into<String>) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    // Dev mode => no auth checks.
    if state.config.dev_mode {
        req.extensions_mut().insert(AuthUser {
            email: "dev@localhost".to_string(),
            name: Some("Dev".to_string()),
            picture: None,
        });
        return next.run(req).await;
    }

    // API key first (service account / bot access).
    if let Some(key) = req
        .headers()
        .get("x-api-key")
        .and_then(|h| h.to_str().ok())
    {
        let valid = state
            .config
            .auth
            .api_key
            .as_deref()
            .is_some_and(|expected| constant_time_eq(key, expected));
        if !valid {
            return unauthorized("Invalid API key");
        }
        req.extensions_mut().insert(AuthUser {
            email: state.config.auth.service_email.clone(),
            name: Some("Service Account".to_string()),
            picture: None,
        });
        return next.run(req).await;
    }

    // Otherwise, a bearer ID token.
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");
    let token = auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
        .unwrap_or("");
    if token.is_empty() {
        return unauthorized("No token provided");
    }

    match state.verifier.verify(token).await {
        Ok(user) => {
            if !state.config.auth.allowed_emails.contains(&user.email) {
                tracing::warn!(email = %user.email, "login from non-allow-listed email");
                return unauthorized("Email not authorized");
            }
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Err(e) => unauthorized(format!("Invalid token: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_time_eq_matches_only_equal_strings() {
        assert!(constant_time_eq("secret", "secret"));
        assert!(!constant_time_eq("secret", "secreT"));
        assert!(!constant_time_eq("secret", "secrets"));
        assert!(!constant_time_eq("", "x"));
        assert!(constant_time_eq("", ""));
    }
}
