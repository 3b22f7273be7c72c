use axum::{
    Json,
    extract::{Path, State},
};
use raffle_sdk::objects::WinnerResponse;
use uuid::Uuid;

use super::WinnerApiError;
use crate::api::extractors::Requester;
use crate::state::AppState;

/// `GET /winners/{id}`
pub(super) async fn get_winner(
    State(state): State<AppState>,
    _requester: Requester,
    Path(id): Path<Uuid>,
) -> Result<Json<WinnerResponse>, WinnerApiError> {
    let record = state
        .winners
        .get_winner(id)
        .await?
        .ok_or(WinnerApiError::NotFound)?;
    Ok(Json(record.into()))
}
