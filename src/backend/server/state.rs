/**
 * Application State Management
 *
 * `AppState` is the axum router state. It holds the hub handle, the loaded
 * configuration and the collaborators handed to every connection. All of
 * it is cheap to clone: the hub handle is a pair of channel senders and the
 * rest sits behind `Arc`.
 *
 * # State Extraction
 *
 * The `FromRef` implementations let handlers extract only the part they
 * need, e.g. `State(hub): State<Hub>`.
 */

use std::sync::Arc;

use axum::extract::FromRef;

use crate::backend::collaborators::{MentionExtractor, MessageStore};
use crate::backend::connection::ConnectionContext;
use crate::backend::hub::Hub;
use crate::shared::AppConfig;

/// Router state shared by all handlers
#[derive(Clone)]
pub struct AppState {
    /// Handle to the running hub control loop
    pub hub: Hub,

    /// Configuration the server was started with
    pub config: Arc<AppConfig>,

    /// Mention extraction applied to every inbound content frame
    pub extractor: Arc<dyn MentionExtractor>,

    /// Persistence sink; the timeline log store when no database is configured
    pub store: Arc<dyn MessageStore>,
}

impl AppState {
    /// Everything a new connection needs, cloned out of the shared state
    pub fn connection_context(&self) -> ConnectionContext {
        ConnectionContext {
            hub: self.hub.clone(),
            store: Arc::clone(&self.store),
            extractor: Arc::clone(&self.extractor),
            config: self.config.connection.clone(),
        }
    }
}

impl FromRef<AppState> for Hub {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.hub.clone()
    }
}

impl FromRef<AppState> for Arc<AppConfig> {
    fn from_ref(app_state: &AppState) -> Self {
        Arc::clone(&app_state.config)
    }
}
