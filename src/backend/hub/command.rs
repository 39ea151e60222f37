//! Commands accepted by the hub control loop.

use tokio::sync::oneshot;

use super::{ConnectionId, HubStats, Member};
use crate::shared::Message;

/// Membership changes; sent on an unbounded channel so `Drop` can use it
#[derive(Debug)]
pub enum MembershipCommand {
    Register {
        member: Member,
        ack: Option<oneshot::Sender<bool>>,
    },
    Unregister(ConnectionId),
    Subscribe { id: ConnectionId, topic: String },
    Unsubscribe { id: ConnectionId, topic: String },
    Shutdown,
}

/// Publishes and queries; sent on the bounded channel in publish order
#[derive(Debug)]
pub enum PublishCommand {
    Broadcast(Message),
    BroadcastToTopic { topic: String, message: Message },
    Stats(oneshot::Sender<HubStats>),
    History(oneshot::Sender<Vec<Message>>),
}
