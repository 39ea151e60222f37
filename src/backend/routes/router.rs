/**
 * Router Configuration
 *
 * Combines the chat and API routes into one router and wraps it in the
 * request tracing layer.
 */

use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::backend::routes::api_routes::configure_api_routes;
use crate::backend::routes::chat_routes::configure_chat_routes;
use crate::backend::server::state::AppState;

/// Create the axum router with all routes configured
///
/// # Route Details
///
/// - `GET /ws/chat` - WebSocket chat connection
/// - `GET /health` - Hub counters
/// - `GET /history` - Replay history snapshot (`?limit=<n>` for the most recent)
///
/// Unknown paths return 404.
pub fn create_router(app_state: AppState) -> Router<()> {
    let router = configure_chat_routes(Router::new());
    let router = configure_api_routes(router);

    router
        .fallback(|| async { (axum::http::StatusCode::NOT_FOUND, "404 Not Found") })
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(app_state)
}
