/**
 * Server Initialization
 *
 * # Initialization Process
 *
 * 1. Load the message store (PostgreSQL if configured)
 * 2. Spawn the hub control loop
 * 3. Build the application state
 * 4. Create the router
 */

use std::sync::Arc;

use axum::Router;

use crate::backend::collaborators::{AtMentionExtractor, MessageStore};
use crate::backend::hub::Hub;
use crate::backend::routes::router::create_router;
use crate::backend::server::config::load_store;
use crate::backend::server::state::AppState;
use crate::shared::AppConfig;

/// Create and configure the axum application
///
/// # Returns
///
/// The router and the hub handle. Call `Hub::shutdown` once the server has
/// stopped serving so every open connection is closed.
pub async fn create_app(config: &AppConfig) -> (Router<()>, Hub) {
    tracing::info!("[Server] Initializing crm-relay");
    let store = load_store(&config.server).await;
    build_app(config, store)
}

/// Assemble the application around an already chosen store
///
/// Must be called inside a tokio runtime, since it spawns the hub.
pub fn build_app(config: &AppConfig, store: Arc<dyn MessageStore>) -> (Router<()>, Hub) {
    let (hub, _task) = Hub::spawn(&config.hub);

    let app_state = AppState {
        hub: hub.clone(),
        config: Arc::new(config.clone()),
        extractor: Arc::new(AtMentionExtractor),
        store,
    };

    let app = create_router(app_state);
    tracing::info!("[Server] Router configured");
    (app, hub)
}
