//! Winner API handlers.
//!
//! # Endpoints
//!
//! - `GET /winners`        – list winner records (paginated, filterable)
//! - `GET /winners/latest` – most recent winner, or `null`
//! - `GET /winners/stats`  – totals per region and top districts
//! - `GET /winners/{id}`   – one winner record

use axum::{Router, http::StatusCode, response::IntoResponse, routing::get};
use raffle_core::eligibility::StorageError;

use crate::state::AppState;

mod get_winner;
mod latest_winner;
mod list_winners;
mod winner_stats;

/// Build the Winner API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/winners", get(list_winners::list_winners))
        .route("/winners/latest", get(latest_winner::latest_winner))
        .route("/winners/stats", get(winner_stats::winner_stats))
        .route("/winners/{id}", get(get_winner::get_winner))
}

/// Errors that can occur in Winner API handlers.
#[derive(Debug)]
enum WinnerApiError {
    Storage(StorageError),
    NotFound,
}

impl From<StorageError> for WinnerApiError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl IntoResponse for WinnerApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            WinnerApiError::Storage(e) => {
                tracing::error!(error = %e, "Winner API storage error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
            WinnerApiError::NotFound => {
                (StatusCode::NOT_FOUND, "winner not found").into_response()
            }
        }
    }
}
