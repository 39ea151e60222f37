//! Shared Error Types
//!
//! Errors raised while decoding and validating inbound client frames.
//! All of them are recoverable: the offending frame is discarded and the
//! connection stays open.
//!
//! # Usage
//!
//! ```rust
//! use crm_relay::shared::error::SharedError;
//!
//! let error = SharedError::validation("content", "must not be empty");
//! assert!(error.to_string().contains("content"));
//! ```
use thiserror::Error;

/// Frame decoding and validation failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SharedError {
    /// The frame was not valid JSON or did not match the frame schema
    #[error("Malformed frame: {message}")]
    MalformedFrame {
        /// Human-readable error message
        message: String,
    },

    /// The frame parsed but one of its fields is unacceptable
    #[error("Validation error in field '{field}': {message}")]
    ValidationError {
        /// The field that failed validation
        field: String,
        /// Human-readable error message
        message: String,
    },
}

impl SharedError {
    /// Create a new malformed-frame error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedFrame {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for SharedError {
    fn from(err: serde_json::Error) -> Self {
        Self::malformed(format!("JSON error: {}", err))
    }
}
