/**
 * Server Service Configuration
 *
 * Loads the optional PostgreSQL pool behind the message store.
 *
 * # Error Handling
 *
 * Database errors are logged but do not prevent server startup. Without a
 * pool the server falls back to the timeline log store.
 */

use std::sync::Arc;

use sqlx::PgPool;

use crate::backend::collaborators::{MessageStore, PgMessageStore, TimelineLogStore};
use crate::shared::ServerConfig;

/// Database configuration result
///
/// `None` if no database URL is configured or the connection failed.
pub type DatabaseConfig = Option<PgPool>;

/// Connect to PostgreSQL and run migrations
///
/// # Arguments
///
/// * `database_url` - connection URL, usually from `DATABASE_URL`
///
/// # Returns
///
/// - `Some(PgPool)` if the pool was created
/// - `None` if no URL is configured or the connection fails
pub async fn load_database(database_url: Option<&str>) -> DatabaseConfig {
    let Some(database_url) = database_url else {
        tracing::info!("[Server] DATABASE_URL not set, messages are only written to the timeline log");
        return None;
    };

    tracing::info!("[Server] Connecting to database...");

    let pool = match PgPool::connect(database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("[Server] Failed to create database connection pool: {:?}", e);
            tracing::warn!("[Server] Falling back to the timeline log store");
            return None;
        }
    };

    tracing::info!("[Server] Running database migrations...");
    match sqlx::migrate!().run(&pool).await {
        Ok(_) => tracing::info!("[Server] Database migrations completed successfully"),
        Err(e) => {
            tracing::error!("[Server] Failed to run database migrations: {}", e);
            tracing::warn!("[Server] Continuing without migrations - database might not be up to date");
        }
    }

    Some(pool)
}

/// Pick the message store for this server
pub async fn load_store(config: &ServerConfig) -> Arc<dyn MessageStore> {
    match load_database(config.database_url.as_deref()).await {
        Some(pool) => Arc::new(PgMessageStore::new(pool)),
        None => Arc::new(TimelineLogStore),
    }
}
