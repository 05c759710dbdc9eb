//! Authentication extractors.
//!
//! This module provides extractors for:
//! - `AuthUser` - a valid HS256 bearer token is required
//! - `OptionalAuthUser` - anonymous callers pass through, but a token that is
//!   presented must still be valid
//!
//! Tokens are issued by the identity provider and signed with the shared
//! `AUTH_JWT_SECRET`. The `sub` claim is the account UUID and `exp` is required.

use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use infograph_core::AccountId;

use crate::error::ApiError;
use crate::state::AppState;

/// An authenticated user extracted from a bearer JWT.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The account ID.
    pub account_id: AccountId,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?.ok_or(ApiError::Unauthorized)?;
        authenticate(token, state)
    }
}

/// The caller's identity, if they presented one.
#[derive(Debug, Clone)]
pub struct OptionalAuthUser(pub Option<AuthUser>);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for OptionalAuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        match bearer_token(parts)? {
            Some(token) => authenticate(token, state).map(|user| Self(Some(user))),
            None => Ok(Self(None)),
        }
    }
}

/// JWT claims accepted by the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (account UUID).
    pub sub: String,
    /// Expiration time (seconds since epoch).
    pub exp: i64,
    /// Issued at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Audience (string or array).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<serde_json::Value>,
}

/// Read the bearer token, if an `Authorization` header is present.
///
/// A header that is present but not a bearer token is rejected rather than
/// treated as anonymous.
fn bearer_token(parts: &Parts) -> Result<Option<&str>, ApiError> {
    let Some(header) = parts.headers.get("authorization") else {
        return Ok(None);
    };

    let token = header
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::Unauthorized)?;

    Ok(Some(token))
}

fn authenticate(token: &str, state: &AppState) -> Result<AuthUser, ApiError> {
    let claims = validate_jwt(token, state)?;

    let account_id = claims.sub.parse::<AccountId>().map_err(|_| {
        tracing::warn!(subject = %claims.sub, "JWT subject is not an account id");
        ApiError::Unauthorized
    })?;

    Ok(AuthUser { account_id })
}

/// Validate an HS256 token against the configured secret.
fn validate_jwt(token: &str, state: &AppState) -> Result<JwtClaims, ApiError> {
    let secret = &state.config.auth_jwt_secret;
    if secret.is_empty() {
        tracing::warn!("Rejecting bearer token: AUTH_JWT_SECRET is not configured");
        return Err(ApiError::Unauthorized);
    }

    let mut validation = Validation::new(Algorithm::HS256);
    match &state.config.auth_audience {
        Some(audience) => validation.set_audience(&[audience]),
        None => validation.validate_aud = false,
    }

    let token_data = decode::<JwtClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        tracing::warn!(error = %e, "JWT validation failed");
        ApiError::Unauthorized
    })?;

    Ok(token_data.claims)
}
