//! Server Module
//!
//! Initialization and shared state of the axum HTTP server.
//!
//! # Module Structure
//!
//! ```text
//! server/
//! ├── mod.rs          - Module exports and documentation
//! ├── state.rs        - AppState and FromRef implementations
//! ├── config.rs       - Database and message store loading
//! └── init.rs         - Server initialization and app creation
//! ```

/// Application state management
pub mod state;

/// Service configuration loading
pub mod config;

/// Server initialization
pub mod init;

pub use init::{build_app, create_app};
pub use state::AppState;
