/**
 * PostgreSQL Message Store
 *
 * Writes accepted messages to the `chat_messages` table. The hub history
 * stays in memory; this table is an audit trail and is never read back by
 * the server.
 */

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::store::{MessageStore, StoreError};
use crate::shared::{Identity, Message};

#[derive(Debug, Clone)]
pub struct PgMessageStore {
    pool: PgPool,
}

impl PgMessageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for PgMessageStore {
    async fn persist(&self, message: &Message, sender: &Identity, mentions: &[String]) -> Result<(), StoreError> {
        let id = Uuid::parse_str(message.id())
            .map_err(|e| StoreError::InvalidRecord(format!("message id {}: {}", message.id(), e)))?;

        sqlx::query(
            r#"
            INSERT INTO chat_messages (id, user_id, sender, content, mentions, topic, sent_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(&sender.user_id)
        .bind(message.sender())
        .bind(message.content())
        .bind(mentions)
        .bind(message.topic())
        .bind(message.timestamp())
        .execute(&self.pool)
        .await?;

        tracing::debug!("[Store] Saved message {} from {}", message.id(), sender.display_name);
        Ok(())
    }
}
