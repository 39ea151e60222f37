/**
 * Client Frame Schema
 *
 * Inbound frames are JSON text. Two encodings are accepted:
 *
 * - The plain content frame `{"content": "..."}`, optionally with a
 *   `"topic"` to address a room.
 * - Tagged control frames with a `"type"` field: `message`, `subscribe`
 *   and `unsubscribe`.
 *
 * Decoding happens once, at the boundary, and yields either a typed
 * `ClientFrame` or a recoverable `SharedError`.
 */
use serde::Deserialize;

use crate::shared::error::SharedError;

/// Longest accepted topic identifier, in bytes
pub const MAX_TOPIC_LEN: usize = 128;

/// A decoded inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    /// A chat message, broadcast globally or to one topic
    Content {
        content: String,
        topic: Option<String>,
    },
    /// Join a topic
    Subscribe { topic: String },
    /// Leave a topic
    Unsubscribe { topic: String },
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TaggedFrame {
    Message {
        content: String,
        #[serde(default)]
        topic: Option<String>,
    },
    Subscribe {
        topic: String,
    },
    Unsubscribe {
        topic: String,
    },
}

#[derive(Deserialize)]
struct ContentFrame {
    content: String,
    #[serde(default)]
    topic: Option<String>,
}

impl ClientFrame {
    /// Decode and validate a text frame
    ///
    /// # Arguments
    /// * `text` - raw frame text
    /// * `max_content_len` - longest accepted content, in characters
    ///
    /// # Errors
    /// * `MalformedFrame` - invalid JSON, missing fields, unknown `type`
    /// * `ValidationError` - blank or oversized content, bad topic
    ///
    /// # Example
    /// ```rust
    /// use crm_relay::shared::ClientFrame;
    ///
    /// let frame = ClientFrame::decode(r#"{"content":"hello @B"}"#, 2000).unwrap();
    /// assert_eq!(frame, ClientFrame::Content { content: "hello @B".into(), topic: None });
    /// ```
    pub fn decode(text: &str, max_content_len: usize) -> Result<Self, SharedError> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        if !value.is_object() {
            return Err(SharedError::malformed("frame must be a JSON object"));
        }

        let frame = if value.get("type").is_some() {
            match serde_json::from_value::<TaggedFrame>(value)? {
                TaggedFrame::Message { content, topic } => Self::Content { content, topic },
                TaggedFrame::Subscribe { topic } => Self::Subscribe { topic },
                TaggedFrame::Unsubscribe { topic } => Self::Unsubscribe { topic },
            }
        } else {
            let ContentFrame { content, topic } = serde_json::from_value(value)?;
            Self::Content { content, topic }
        };

        frame.validate(max_content_len)
    }

    fn validate(self, max_content_len: usize) -> Result<Self, SharedError> {
        match &self {
            Self::Content { content, topic } => {
                if content.trim().is_empty() {
                    return Err(SharedError::validation("content", "must not be empty"));
                }
                let len = content.chars().count();
                if len > max_content_len {
                    return Err(SharedError::validation(
                        "content",
                        format!("{} characters exceeds the limit of {}", len, max_content_len),
                    ));
                }
                if let Some(topic) = topic {
                    validate_topic(topic)?;
                }
            }
            Self::Subscribe { topic } | Self::Unsubscribe { topic } => validate_topic(topic)?,
        }
        Ok(self)
    }
}

fn validate_topic(topic: &str) -> Result<(), SharedError> {
    if topic.trim().is_empty() {
        return Err(SharedError::validation("topic", "must not be empty"));
    }
    if topic.len() > MAX_TOPIC_LEN {
        return Err(SharedError::validation("topic", "too long"));
    }
    Ok(())
}
