//! HTTP and WebSocket API, mounted under `/api/v1`.

pub mod admin;
pub mod draw;
pub mod extractors;
pub mod winners;

use axum::Router;

use crate::state::AppState;

/// Routes relative to `/api/v1`.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(draw::router())
        .merge(winners::router())
        .merge(admin::router())
}
