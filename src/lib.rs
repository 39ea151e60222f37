//! crm-relay - Main Library
//!
//! crm-relay is the real-time communication backend of a CRM: live chat
//! connections register with a single hub, which replays recent history to
//! newcomers and fans every new message out to everyone connected without
//! ever waiting on a slow client.
//!
//! # Module Structure
//!
//! - **`shared`** - Types that cross the wire
//!   - `Message`, the client frame schema, shared error types
//!   - Application configuration
//!
//! - **`backend`** - Server-side code (only compiled with `ssr` feature)
//!   - The hub control loop and its room index
//!   - Connection pumps and the transport abstraction
//!   - Persistence and mention-extraction collaborators
//!   - Axum HTTP/WebSocket server
//!
//! # Feature Flags
//!
//! - **`ssr`** - Server-side code (enabled by default)
//!   - Includes tokio, axum, sqlx
//!
//! # Usage
//!
//! ```rust,no_run
//! use crm_relay::backend::server::init::create_app;
//! use crm_relay::shared::AppConfig;
//!
//! # async fn example() {
//! let config = AppConfig::default();
//! let (app, _hub) = create_app(&config).await;
//! // Serve `app` with axum::serve
//! # }
//! ```
//!
//! # Thread Safety
//!
//! Hub state is owned by exactly one task. Everything else talks to it
//! through the cloneable `Hub` handle, which only sends commands over
//! channels.

/// Shared types and data structures
pub mod shared;

/// Backend server-side code
#[cfg(feature = "ssr")]
pub mod backend;
