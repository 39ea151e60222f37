/**
 * Backend Error Types
 *
 * Errors produced by HTTP handlers. Connection and hub failures never
 * reach this type; they are contained in the pumps. Only the request/
 * response surface (`/health`, `/history`) returns a `BackendError`.
 *
 * # Error Categories
 *
 * - `HandlerError` - bad request parameters, carries its own status
 * - `HubUnavailable` - the hub control loop has stopped
 */

use axum::http::StatusCode;
use thiserror::Error;

use crate::backend::hub::HubError;

/// Backend-specific error types
///
/// # Usage
///
/// ```rust
/// use crm_relay::backend::error::BackendError;
/// use axum::http::StatusCode;
///
/// let err = BackendError::handler(StatusCode::BAD_REQUEST, "limit must be greater than 0");
/// assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
/// ```
#[derive(Debug, Error)]
pub enum BackendError {
    /// Invalid request parameters (e.g. a bad `/history` limit)
    #[error("Handler error: {message}")]
    HandlerError {
        /// HTTP status code for this error
        status: StatusCode,
        /// Human-readable error message
        message: String,
    },

    /// The hub is no longer accepting commands
    #[error("Hub unavailable: {0}")]
    HubUnavailable(#[from] HubError),
}

impl BackendError {
    /// Create a new handler error with a status code
    ///
    /// # Arguments
    ///
    /// * `status` - HTTP status code
    /// * `message` - Error message
    pub fn handler(status: StatusCode, message: impl Into<String>) -> Self {
        Self::HandlerError {
            status,
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    ///
    /// # Status Code Mapping
    ///
    /// - `HandlerError` - Uses the status code from the error
    /// - `HubUnavailable` - 503 Service Unavailable
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::HandlerError { status, .. } => *status,
            Self::HubUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Message placed in the response body
    pub fn message(&self) -> String {
        match self {
            Self::HandlerError { message, .. } => message.clone(),
            Self::HubUnavailable(_) => self.to_string(),
        }
    }
}
