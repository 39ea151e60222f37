/**
 * Message Persistence
 *
 * The hub never waits on storage. Connections hand every accepted message
 * to a `MessageStore` from a spawned task and only log the outcome.
 */

use async_trait::async_trait;
use thiserror::Error;

use crate::shared::{Identity, Message};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

/// Persistence sink for accepted messages
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Record a message sent by `sender`
    ///
    /// # Arguments
    /// * `message` - the message as it will be broadcast
    /// * `sender` - identity of the sending connection
    /// * `mentions` - names mentioned in the content
    async fn persist(&self, message: &Message, sender: &Identity, mentions: &[String]) -> Result<(), StoreError>;
}

/// Store that only writes timeline events to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct TimelineLogStore;

#[async_trait]
impl MessageStore for TimelineLogStore {
    async fn persist(&self, message: &Message, sender: &Identity, mentions: &[String]) -> Result<(), StoreError> {
        tracing::info!(
            "[Store] Timeline event: User {} sent a message at {}",
            sender.display_name,
            message.timestamp().to_rfc3339()
        );
        if !mentions.is_empty() {
            tracing::info!("[Store] Timeline event: mentioned users: {:?}", mentions);
        }
        Ok(())
    }
}
