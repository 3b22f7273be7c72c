use axum::{Json, extract::State};
use raffle_sdk::objects::WinnerStatsResponse;

use super::WinnerApiError;
use crate::api::extractors::Requester;
use crate::state::AppState;

/// `GET /winners/stats`
pub(super) async fn winner_stats(
    State(state): State<AppState>,
    _requester: Requester,
) -> Result<Json<WinnerStatsResponse>, WinnerApiError> {
    let stats = state.winners.winner_stats().await?;
    Ok(Json(stats.into()))
}
