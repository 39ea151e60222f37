//! Collaborators consumed by connections: mention extraction and
//! fire-and-forget persistence.

pub mod db;
pub mod mentions;
pub mod store;

pub use db::PgMessageStore;
pub use mentions::{AtMentionExtractor, MentionExtractor};
pub use store::{MessageStore, StoreError, TimelineLogStore};
