use axum::{Json, extract::State};
use raffle_sdk::objects::{DrawCompleted, DrawRequest};

use super::DrawApiError;
use crate::api::extractors::Requester;
use crate::state::AppState;

/// `POST /draw` – run one draw and answer with its result.
///
/// Progress still goes to the requester's WebSocket sessions. Without a
/// body the configured default exclusion applies.
pub(super) async fn select_winner(
    State(state): State<AppState>,
    Requester(requester): Requester,
    body: Option<Json<DrawRequest>>,
) -> Result<Json<DrawCompleted>, DrawApiError> {
    let request = match body {
        Some(Json(request)) => request,
        None => DrawRequest {
            exclude_previous_winners: state.default_exclusion().await,
        },
    };
    let outcome = state.draws.start(requester, request)?.join().await?;
    Ok(Json(outcome.into()))
}
