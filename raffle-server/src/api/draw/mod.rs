//! Draw API handlers.
//!
//! # Endpoints
//!
//! - `POST /draw`      – run one draw and return the winner
//! - `GET /draw/ws`    – WebSocket draw session for one requester
//! - `GET /draw/stats` – population a draw would currently run against

use axum::{
    Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use raffle_core::eligibility::StorageError;
use raffle_core::orchestrator::DrawError;

use crate::state::AppState;

mod select;
mod stats;
mod ws;

/// Build the Draw API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/draw", post(select::select_winner))
        .route("/draw/ws", get(ws::draw_ws))
        .route("/draw/stats", get(stats::selection_stats))
}

/// Errors that can occur in Draw API handlers.
#[derive(Debug, thiserror::Error)]
enum DrawApiError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Draw(#[from] DrawError),
}

impl IntoResponse for DrawApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            DrawApiError::Storage(e) => {
                tracing::error!(error = %e, "Draw API storage error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
            DrawApiError::Draw(e) => {
                let status = match &e {
                    DrawError::DrawInProgress | DrawError::RaceLost | DrawError::Cancelled => {
                        StatusCode::CONFLICT
                    }
                    DrawError::NoEligibleCandidates(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    DrawError::Storage(_) | DrawError::Sampler(_) | DrawError::Aborted => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, e.reason()).into_response()
            }
        }
    }
}
