/**
 * Hub State
 *
 * Membership, history and the topic index, owned by the control loop.
 * Every method here is synchronous and never waits on a connection: sends
 * to outbound queues use `try_send`, and a queue that cannot take a message
 * gets its connection evicted on the spot.
 *
 * # Invariants
 *
 * - A registered member always holds the only sender of its outbound queue.
 *   Removing the member drops that sender, which closes the queue exactly
 *   once.
 * - History replay and the welcome message reach a new member before any
 *   later broadcast, because both happen inside `register`.
 * - Replay only carries hub-wide messages. Topic messages are kept in the
 *   history log but never replayed, so they reach their live subscribers
 *   and nobody else.
 */

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};

use super::history::History;
use super::rooms::RoomIndex;
use super::ConnectionId;
use crate::shared::{AutoReplyPolicy, HubConfig, Identity, Message};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// A connection as seen by the hub: its identity and outbound queue
#[derive(Debug)]
pub struct Member {
    pub(crate) id: ConnectionId,
    pub(crate) identity: Identity,
    pub(crate) outbound: mpsc::Sender<Message>,
}

impl Member {
    /// Create a member with a fresh connection id and a bounded outbound queue
    ///
    /// Returns the member (handed to the hub) and the receiving half of the
    /// queue (owned by the connection's egress pump).
    pub fn new(identity: Identity, capacity: usize) -> (Self, mpsc::Receiver<Message>) {
        let (outbound, rx) = mpsc::channel(capacity);
        let id = NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed);
        (Self { id, identity, outbound }, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }
}

#[derive(Debug)]
struct Entry {
    identity: Identity,
    outbound: mpsc::Sender<Message>,
    topics: HashSet<String>,
    registrations: usize,
}

/// Result of a register request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// Newly added and fully replayed
    Joined { replayed: usize },
    /// Already a member; only the registration count changed
    AlreadyMember,
    /// The queue filled up or closed during replay
    Evicted,
}

/// Result of one fan-out
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: usize,
    pub evicted: Vec<ConnectionId>,
}

/// Point-in-time counters, served by the control loop
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct HubStats {
    pub connections: usize,
    pub history: usize,
    pub topics: usize,
    pub evictions: u64,
}

pub struct HubState {
    members: HashMap<ConnectionId, Entry>,
    history: History,
    rooms: RoomIndex,
    welcome_message: bool,
    auto_reply: AutoReplyPolicy,
    evictions: u64,
}

impl HubState {
    pub fn new(config: &HubConfig) -> Self {
        Self {
            members: HashMap::new(),
            history: History::new(config.history_limit),
            rooms: RoomIndex::new(),
            welcome_message: config.welcome_message,
            auto_reply: config.auto_reply.clone(),
            evictions: 0,
        }
    }

    /// Add a member and replay hub-wide history (then the welcome message) to it
    pub fn register(&mut self, member: Member) -> RegisterOutcome {
        if let Some(entry) = self.members.get_mut(&member.id) {
            entry.registrations += 1;
            return RegisterOutcome::AlreadyMember;
        }

        let Member { id, identity, outbound } = member;
        let replayed = match self.replay(&outbound, &identity) {
            Ok(replayed) => replayed,
            Err(err) => {
                self.log_send_failure(id, &identity, &err);
                if matches!(err, TrySendError::Full(_)) {
                    self.evictions += 1;
                }
                return RegisterOutcome::Evicted;
            }
        };

        tracing::info!(
            "[Hub] Client registered: {} ({}) conn={} replayed={} total={}",
            identity.display_name,
            identity.user_id,
            id,
            replayed,
            self.members.len() + 1
        );
        self.members.insert(
            id,
            Entry {
                identity,
                outbound,
                topics: HashSet::new(),
                registrations: 1,
            },
        );
        RegisterOutcome::Joined { replayed }
    }

    /// Balance one register call; the member leaves when none remain
    ///
    /// Returns true if the member was removed. Unknown ids are ignored.
    pub fn unregister(&mut self, id: ConnectionId) -> bool {
        let Some(entry) = self.members.get_mut(&id) else {
            return false;
        };
        entry.registrations -= 1;
        if entry.registrations > 0 {
            return false;
        }
        self.remove(id);
        true
    }

    /// Append to history and deliver to every member
    ///
    /// Auto-replies, when enabled, are appended and delivered right after.
    pub fn broadcast(&mut self, message: Message) -> Delivery {
        let replies = self.auto_replies(&message);
        self.history.push(message.clone());
        let targets: Vec<ConnectionId> = self.members.keys().copied().collect();
        let mut delivery = self.deliver(&targets, &message);

        for reply in replies {
            self.history.push(reply.clone());
            let targets: Vec<ConnectionId> = self.members.keys().copied().collect();
            let next = self.deliver(&targets, &reply);
            delivery.delivered += next.delivered;
            delivery.evicted.extend(next.evicted);
        }
        delivery
    }

    /// Append to history and deliver to the topic's subscribers only
    pub fn broadcast_to_topic(&mut self, topic: &str, message: Message) -> Delivery {
        let message = if message.topic() == Some(topic) {
            message
        } else {
            message.with_topic(topic)
        };
        let replies = self.auto_replies(&message);
        self.history.push(message.clone());
        let subscribers = self.rooms.subscribers(topic);
        let mut delivery = self.deliver(&subscribers, &message);

        for reply in replies {
            let reply = reply.with_topic(topic);
            self.history.push(reply.clone());
            let subscribers = self.rooms.subscribers(topic);
            let next = self.deliver(&subscribers, &reply);
            delivery.delivered += next.delivered;
            delivery.evicted.extend(next.evicted);
        }
        delivery
    }

    /// Subscribe a registered member to a topic
    pub fn subscribe(&mut self, id: ConnectionId, topic: &str) -> bool {
        let Some(entry) = self.members.get_mut(&id) else {
            tracing::debug!("[Hub] Ignoring subscribe from unknown conn={}", id);
            return false;
        };
        if !entry.topics.insert(topic.to_string()) {
            return false;
        }
        self.rooms.subscribe(topic, id);
        tracing::info!("[Hub] Client {} subscribed to room {}", entry.identity.display_name, topic);
        true
    }

    pub fn unsubscribe(&mut self, id: ConnectionId, topic: &str) -> bool {
        let Some(entry) = self.members.get_mut(&id) else {
            return false;
        };
        if !entry.topics.remove(topic) {
            return false;
        }
        self.rooms.unsubscribe(topic, id);
        tracing::info!("[Hub] Client {} unsubscribed from room {}", entry.identity.display_name, topic);
        true
    }

    pub fn stats(&self) -> HubStats {
        HubStats {
            connections: self.members.len(),
            history: self.history.len(),
            topics: self.rooms.topic_count(),
            evictions: self.evictions,
        }
    }

    pub fn history(&self) -> Vec<Message> {
        self.history.snapshot()
    }

    pub fn is_member(&self, id: ConnectionId) -> bool {
        self.members.contains_key(&id)
    }

    #[cfg(test)]
    pub(crate) fn member_ids(&self) -> HashSet<ConnectionId> {
        self.members.keys().copied().collect()
    }

    fn replay(&self, outbound: &mpsc::Sender<Message>, identity: &Identity) -> Result<usize, TrySendError<Message>> {
        let mut replayed = 0;
        for message in self.history.iter().filter(|message| message.topic().is_none()) {
            outbound.try_send(message.clone())?;
            replayed += 1;
        }
        if self.welcome_message {
            outbound.try_send(Message::system(format!(
                "Welcome to the chat, {}!",
                identity.display_name
            )))?;
        }
        Ok(replayed)
    }

    fn deliver(&mut self, targets: &[ConnectionId], message: &Message) -> Delivery {
        let mut delivery = Delivery::default();
        for id in targets {
            let Some(entry) = self.members.get(id) else {
                continue;
            };
            match entry.outbound.try_send(message.clone()) {
                Ok(()) => delivery.delivered += 1,
                Err(err) => {
                    self.log_send_failure(*id, &entry.identity, &err);
                    if matches!(err, TrySendError::Full(_)) {
                        self.evictions += 1;
                    }
                    delivery.evicted.push(*id);
                }
            }
        }
        for id in &delivery.evicted {
            self.remove(*id);
        }
        delivery
    }

    fn remove(&mut self, id: ConnectionId) {
        if let Some(entry) = self.members.remove(&id) {
            self.rooms.remove_member(id, &entry.topics);
            tracing::info!(
                "[Hub] Client unregistered: {} conn={} total={}",
                entry.identity.display_name,
                id,
                self.members.len()
            );
            // entry.outbound drops here, closing the queue
        }
    }

    fn auto_replies(&self, message: &Message) -> Vec<Message> {
        if !self.auto_reply.enabled {
            return Vec::new();
        }
        message
            .mentions()
            .iter()
            .filter(|mention| self.auto_reply.reply_to_self_mentions || mention.as_str() != message.sender())
            .map(|mention| {
                Message::new(
                    mention.clone(),
                    self.auto_reply.render(message.sender()),
                    vec![message.sender().to_string()],
                )
            })
            .collect()
    }

    fn log_send_failure(&self, id: ConnectionId, identity: &Identity, err: &TrySendError<Message>) {
        match err {
            TrySendError::Full(_) => tracing::warn!(
                "[Hub] Dropped slow client {} conn={} (outbound queue full)",
                identity.display_name,
                id
            ),
            TrySendError::Closed(_) => tracing::debug!(
                "[Hub] Outbound queue already closed for {} conn={}",
                identity.display_name,
                id
            ),
        }
    }
}
