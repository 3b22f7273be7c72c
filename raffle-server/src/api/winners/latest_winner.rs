use axum::{Json, extract::State};
use raffle_sdk::objects::WinnerResponse;

use super::WinnerApiError;
use crate::api::extractors::Requester;
use crate::state::AppState;

/// `GET /winners/latest`
pub(super) async fn latest_winner(
    State(state): State<AppState>,
    _requester: Requester,
) -> Result<Json<Option<WinnerResponse>>, WinnerApiError> {
    let latest = state.winners.latest_winner().await?;
    Ok(Json(latest.map(WinnerResponse::from)))
}
