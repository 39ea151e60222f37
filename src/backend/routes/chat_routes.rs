/**
 * Chat Route Handlers
 *
 * # Routes
 *
 * - `GET /ws/chat?user_id=<id>&username=<name>` - WebSocket upgrade
 *
 * Both query parameters are optional; missing values are synthesized by
 * `Identity::resolve`. After the upgrade the socket runs as a hub
 * connection until either side goes away.
 */

use axum::{
    extract::{ws::WebSocketUpgrade, Query, State},
    response::Response,
    Router,
};
use serde::Deserialize;

use crate::backend::connection::{serve_connection, WsTransport};
use crate::backend::server::state::AppState;
use crate::shared::Identity;

/// Connect-time identity parameters
#[derive(Debug, Default, Deserialize)]
pub struct ConnectParams {
    pub user_id: Option<String>,
    pub username: Option<String>,
}

/// Configure chat-related routes
///
/// # Arguments
///
/// * `router` - The router to add routes to
///
/// # Returns
///
/// Router with the WebSocket chat endpoint configured
pub fn configure_chat_routes(router: Router<AppState>) -> Router<AppState> {
    router.route("/ws/chat", axum::routing::get(handle_chat_socket))
}

/// Upgrade to a WebSocket and serve it as a hub connection
pub async fn handle_chat_socket(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<AppState>,
) -> Response {
    let identity = Identity::resolve(params.user_id, params.username);
    let ctx = state.connection_context();
    tracing::debug!(
        "[Server] WebSocket upgrade requested by {} ({})",
        identity.display_name,
        identity.user_id
    );

    ws.max_message_size(ctx.config.max_frame_bytes)
        .on_upgrade(move |socket| async move {
            serve_connection(WsTransport::new(socket), identity, ctx).await;
        })
}
