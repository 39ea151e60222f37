/**
 * Message Data Structure
 *
 * This module defines the Message struct broadcast by the hub and the
 * Identity attached to every connection.
 *
 * A Message is immutable once created: the fields are private and only
 * exposed through accessors, so a message replayed from history is exactly
 * the message that was originally broadcast.
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sender name used for messages generated by the server itself
pub const SYSTEM_SENDER: &str = "System";

/// Represents a single chat message
///
/// This is also the outbound wire frame: serializing a Message produces
/// `{"id", "sender", "content", "mentions", "timestamp"}` with the
/// timestamp in RFC3339. `topic` is only present for room broadcasts.
///
/// # Example
/// ```rust
/// use crm_relay::shared::Message;
///
/// let message = Message::new("Alice", "hello @Bob", vec!["Bob".to_string()]);
/// assert_eq!(message.sender(), "Alice");
/// assert_eq!(message.mentions(), ["Bob".to_string()]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    id: String,
    sender: String,
    content: String,
    mentions: Vec<String>,
    timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    topic: Option<String>,
}

impl Message {
    /// Create a new message with a fresh id and the current UTC timestamp
    ///
    /// `mentions` is expected to come from a mention extractor; it is
    /// deduplicated here as well so the set invariant holds regardless of
    /// the extractor used.
    pub fn new(sender: impl Into<String>, content: impl Into<String>, mentions: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender: sender.into(),
            content: content.into(),
            mentions: dedup_preserving_order(mentions),
            timestamp: Utc::now(),
            topic: None,
        }
    }

    /// Create a message generated by the server (welcome, notices)
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(SYSTEM_SENDER, content, Vec::new())
    }

    /// Scope the message to a topic
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn mentions(&self) -> &[String] {
        &self.mentions
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    /// Serialize the message to its outbound JSON frame
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

fn dedup_preserving_order(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::with_capacity(items.len());
    items.into_iter().filter(|item| seen.insert(item.clone())).collect()
}

/// Identity of a connected user
///
/// Assigned at connect time from the caller's parameters. Missing values
/// are synthesized so every connection has a usable identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Identity {
    /// Stable user identifier
    pub user_id: String,
    /// Name shown as the message sender and matched by mentions
    pub display_name: String,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
        }
    }

    /// Build an identity from optional connect-time parameters
    ///
    /// A blank or missing user id becomes a random UUID; a blank or missing
    /// display name is derived from the user id as `User-xxxxx`.
    ///
    /// # Example
    /// ```rust
    /// use crm_relay::shared::Identity;
    ///
    /// let identity = Identity::resolve(Some("42abcdef".into()), None);
    /// assert_eq!(identity.display_name, "User-42abc");
    /// ```
    pub fn resolve(user_id: Option<String>, display_name: Option<String>) -> Self {
        let user_id = non_blank(user_id).unwrap_or_else(|| Uuid::new_v4().to_string());
        let display_name = non_blank(display_name).unwrap_or_else(|| {
            let prefix: String = user_id.chars().take(5).collect();
            format!("User-{}", prefix)
        });
        Self { user_id, display_name }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
