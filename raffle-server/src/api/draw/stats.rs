use axum::{
    Json,
    extract::{Query, State},
};
use raffle_sdk::objects::SelectionStatsResponse;
use raffle_sdk::objects::draw::SelectionStatsQuery;

use super::DrawApiError;
use crate::api::extractors::Requester;
use crate::state::AppState;

/// `GET /draw/stats` – counts of active regions, districts and participants,
/// plus how many participants are currently eligible.
pub(super) async fn selection_stats(
    State(state): State<AppState>,
    _requester: Requester,
    Query(query): Query<SelectionStatsQuery>,
) -> Result<Json<SelectionStatsResponse>, DrawApiError> {
    let exclude = match query.exclude_previous_winners {
        Some(flag) => flag,
        None => state.default_exclusion().await,
    };
    let stats = state.eligibility.selection_stats(exclude).await?;
    Ok(Json(stats.into()))
}
