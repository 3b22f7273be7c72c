//! Admin API handlers.
//!
//! These endpoints require the `Raffle-Admin-Authorization` header with the
//! plaintext admin secret.
//!
//! # Endpoints
//!
//! - `POST /admin/winners/reset` – delete every winner record

use axum::{Router, http::StatusCode, response::IntoResponse, routing::post};
use raffle_core::eligibility::StorageError;

use crate::state::AppState;

mod reset_winners;

/// Build the Admin API router.
pub fn router() -> Router<AppState> {
    Router::new().route("/admin/winners/reset", post(reset_winners::reset_winners))
}

/// Errors that can occur in Admin API handlers.
#[derive(Debug)]
pub(crate) enum AdminApiError {
    Storage(StorageError),
}

impl IntoResponse for AdminApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            AdminApiError::Storage(e) => {
                tracing::error!(error = %e, "Admin API storage error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
        }
    }
}
