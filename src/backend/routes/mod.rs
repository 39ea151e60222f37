//! Route Configuration Module
//!
//! # Module Structure
//!
//! ```text
//! routes/
//! ├── mod.rs          - Module exports and documentation
//! ├── router.rs       - Main router creation
//! ├── chat_routes.rs  - WebSocket chat endpoint
//! └── api_routes.rs   - Health and history endpoints
//! ```

/// Main router creation
pub mod router;

/// Chat-related route handlers
pub mod chat_routes;

/// API endpoint handlers
pub mod api_routes;

pub use router::create_router;
