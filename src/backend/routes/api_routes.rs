/**
 * API Route Handlers
 *
 * # Routes
 *
 * - `GET /health` - hub liveness and counters
 * - `GET /history?limit=<n>` - snapshot of the replay history, optionally
 *   only the `n` most recent messages
 *
 * Both are served by the hub control loop, so they reflect every broadcast
 * submitted before the request. A stopped hub yields 503.
 */

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::backend::error::BackendError;
use crate::backend::hub::{Hub, HubStats};
use crate::backend::server::state::AppState;
use crate::shared::Message;

/// Body of `GET /health`
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub stats: HubStats,
}

/// Query parameters of `GET /history`
#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    /// Keep only this many of the most recent messages
    pub limit: Option<usize>,
}

/// Configure API routes
pub fn configure_api_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/health", axum::routing::get(health))
        .route("/history", axum::routing::get(history))
}

pub async fn health(State(hub): State<Hub>) -> Result<Json<HealthResponse>, BackendError> {
    let stats = hub.stats().await?;
    Ok(Json(HealthResponse { status: "ok", stats }))
}

pub async fn history(
    State(hub): State<Hub>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> Result<Json<Vec<Message>>, BackendError> {
    let Query(params) = params.map_err(|rejection| BackendError::handler(StatusCode::BAD_REQUEST, rejection.body_text()))?;
    if params.limit == Some(0) {
        return Err(BackendError::handler(StatusCode::BAD_REQUEST, "limit must be greater than 0"));
    }

    let mut messages = hub.history().await?;
    if let Some(limit) = params.limit {
        let skip = messages.len().saturating_sub(limit);
        messages.drain(..skip);
    }
    Ok(Json(messages))
}
