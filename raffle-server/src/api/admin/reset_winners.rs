use axum::{Json, extract::State};
use raffle_sdk::objects::admin::ResetWinnersResponse;

use super::AdminApiError;
use crate::api::extractors::AdminAuth;
use crate::state::AppState;

/// `POST /admin/winners/reset` – delete all winner records.
///
/// Afterwards every participant is eligible again, including under exclusion.
pub(super) async fn reset_winners(
    State(state): State<AppState>,
    _auth: AdminAuth,
) -> Result<Json<ResetWinnersResponse>, AdminApiError> {
    let deleted_count = state
        .recorder
        .reset_all()
        .await
        .map_err(AdminApiError::Storage)?;

    tracing::info!(deleted_count, "Admin API: winners reset");
    Ok(Json(ResetWinnersResponse { deleted_count }))
}
