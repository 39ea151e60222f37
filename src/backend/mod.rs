//! Backend Module
//!
//! All server-side code: the hub, the connection pumps, the collaborators
//! they call and the axum server around them. Only compiled with the `ssr`
//! feature.
//!
//! # Architecture
//!
//! - **`hub`** - Control loop owning membership, history and topics
//! - **`connection`** - Transport abstraction, ingress/egress pumps
//! - **`collaborators`** - Mention extraction and message persistence
//! - **`server`** - Application state and initialization
//! - **`routes`** - HTTP route configuration
//! - **`error`** - HTTP error types
//!
//! # Module Structure
//!
//! ```text
//! backend/
//! ├── mod.rs          - Module exports and documentation
//! ├── hub/            - Hub control loop, history, room index
//! ├── connection/     - Pumps, transport traits, WebSocket adapter
//! ├── collaborators/  - MentionExtractor, MessageStore
//! ├── server/         - Server initialization and state
//! ├── routes/         - Route configuration
//! └── error/          - Error types
//! ```
//!
//! # Data Flow
//!
//! ```text
//! WebSocket ─► ingress ─► Hub::broadcast ─► control loop ─► outbound queues ─► egress ─► WebSocket
//!                 └─► MessageStore (spawned, fire-and-forget)
//! ```

/// Hub control loop
pub mod hub;

/// Connection pumps and transports
pub mod connection;

/// External collaborators
pub mod collaborators;

/// Server setup and configuration
pub mod server;

/// Route configuration
pub mod routes;

/// Backend error types
pub mod error;

pub use connection::{serve_connection, ConnectionContext, ExitReason};
pub use error::BackendError;
pub use hub::{Hub, HubError, HubStats};
pub use server::create_app;
