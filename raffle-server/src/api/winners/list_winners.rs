use axum::{
    Json,
    extract::{Query, State},
};
use raffle_core::recorder::WinnerFilter;
use raffle_sdk::objects::WinnerPageResponse;
use raffle_sdk::objects::winners::{ListWinnersQuery, clamp_pagination};

use super::WinnerApiError;
use crate::api::extractors::Requester;
use crate::state::AppState;

/// `GET /winners` – newest first, optionally filtered by region or district.
pub(super) async fn list_winners(
    State(state): State<AppState>,
    _requester: Requester,
    Query(query): Query<ListWinnersQuery>,
) -> Result<Json<WinnerPageResponse>, WinnerApiError> {
    let (limit, offset) = clamp_pagination(query.limit, query.offset);
    let filter = WinnerFilter {
        region_id: query.region_id,
        district_id: query.district_id,
    };

    let page = state.winners.list_winners(filter, limit, offset).await?;
    Ok(Json(page.into_response(limit, offset)))
}
