//! Shared Module
//!
//! This module contains the types that cross the WebSocket boundary and the
//! configuration shared by the server and the hub. Nothing in here depends
//! on tokio or axum, so these types also compile without the `ssr` feature.

/// Message data structure
pub mod message;

/// Inbound client frame schema
pub mod frame;

/// Shared error types
pub mod error;

/// Application configuration
pub mod config;

/// Re-export commonly used types for convenience
pub use message::{Identity, Message, SYSTEM_SENDER};
pub use frame::ClientFrame;
pub use error::SharedError;
pub use config::{AppConfig, AppConfigBuilder, AutoReplyPolicy, ConfigError, ConnectionConfig, HubConfig, ServerConfig};
