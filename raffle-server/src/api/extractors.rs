//! Custom Axum extractors for request identification and authentication.
//!
//! Provides:
//! - `Requester` identifies the caller from the `Raffle-Requester` header or
//!   the `requester` query parameter (browsers cannot set headers on a
//!   WebSocket upgrade).
//! - `AdminAuth` checks the `Raffle-Admin-Authorization` header against the
//!   configured argon2 admin secret hash.

use axum::{
    extract::{FromRequestParts, Query},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use raffle_core::guard::RequesterId;
use raffle_sdk::objects::{ADMIN_AUTH_HEADER, REQUESTER_HEADER};
use serde::Deserialize;

use crate::state::AppState;

const MAX_REQUESTER_LEN: usize = 128;

// ---------------------------------------------------------------------------
// Requester
// ---------------------------------------------------------------------------

/// Identity of the caller. Draws are serialized per requester.
pub struct Requester(pub RequesterId);

#[derive(Debug, thiserror::Error)]
pub enum RequesterError {
    #[error("missing Raffle-Requester header or requester query parameter")]
    Missing,
    #[error("invalid requester")]
    Invalid,
}

impl IntoResponse for RequesterError {
    fn into_response(self) -> Response {
        let status = match self {
            RequesterError::Missing => StatusCode::UNAUTHORIZED,
            RequesterError::Invalid => StatusCode::BAD_REQUEST,
        };
        (status, self.to_string()).into_response()
    }
}

#[derive(Deserialize)]
struct RequesterQuery {
    requester: Option<String>,
}

fn validate(raw: &str) -> Result<RequesterId, RequesterError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(RequesterError::Missing);
    }
    if trimmed.len() > MAX_REQUESTER_LEN || trimmed.chars().any(char::is_control) {
        return Err(RequesterError::Invalid);
    }
    Ok(RequesterId::new(trimmed))
}

impl<S: Send + Sync> FromRequestParts<S> for Requester {
    type Rejection = RequesterError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(value) = parts.headers.get(REQUESTER_HEADER) {
            let value = value.to_str().map_err(|_| RequesterError::Invalid)?;
            return validate(value).map(Requester);
        }

        let query = Query::<RequesterQuery>::try_from_uri(&parts.uri)
            .map_err(|_| RequesterError::Invalid)?;
        match query.0.requester {
            Some(value) => validate(&value).map(Requester),
            None => Err(RequesterError::Missing),
        }
    }
}

// ---------------------------------------------------------------------------
// AdminAuth
// ---------------------------------------------------------------------------

/// Marker extractor for requests carrying the admin secret.
pub struct AdminAuth;

#[derive(Debug, thiserror::Error)]
pub enum AdminAuthError {
    #[error("missing Raffle-Admin-Authorization header")]
    MissingHeader,
    #[error("invalid admin credentials")]
    InvalidSecret,
}

impl IntoResponse for AdminAuthError {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, self.to_string()).into_response()
    }
}

impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = AdminAuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let secret = parts
            .headers
            .get(ADMIN_AUTH_HEADER)
            .ok_or(AdminAuthError::MissingHeader)?
            .to_str()
            .map_err(|_| AdminAuthError::InvalidSecret)?;

        let admin = state.config.admin().await;
        if !admin.verify_secret(secret) {
            drop(admin);
            tracing::warn!("Admin API: rejected credentials");
            return Err(AdminAuthError::InvalidSecret);
        }
        drop(admin);
        Ok(AdminAuth)
    }
}
