use axum::{extract::FromRequestParts, http::request::Parts, http::HeaderMap};
use std::convert::Infallible;
use std::sync::Arc;

use super::jwt::validate_token;
use crate::state::AppState;

/// Who is calling, as far as read paths care.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Anonymous,
    User,
    Admin,
}

impl Role {
    /// Resolve from an `Authorization: Bearer` header. Missing, malformed,
    /// expired or wrongly signed tokens resolve to `Anonymous`.
    pub fn from_headers(headers: &HeaderMap, secret: &str) -> Self {
        let token = headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));

        let Some(token) = token else {
            return Role::Anonymous;
        };

        match validate_token(token.trim(), secret) {
            Ok(claims) if claims.role == "admin" => Role::Admin,
            Ok(_) => Role::User,
            Err(e) => {
                tracing::debug!("ignoring invalid bearer token: {e}");
                Role::Anonymous
            }
        }
    }
}

/// Extractor for the caller's [`Role`]. Never rejects a request.
#[derive(Debug, Clone, Copy)]
pub struct CallerRole(pub Role);

impl FromRequestParts<Arc<AppState>> for CallerRole {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(CallerRole(Role::from_headers(&parts.headers, &state.jwt_secret)))
    }
}
