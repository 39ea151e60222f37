/**
 * Room / Topic Index
 *
 * Maps a topic identifier to the connections subscribed to it. Topics are
 * created on first subscription and pruned as soon as their last
 * subscriber leaves.
 */

use std::collections::{HashMap, HashSet};

use super::ConnectionId;

#[derive(Debug, Default)]
pub(crate) struct RoomIndex {
    rooms: HashMap<String, HashSet<ConnectionId>>,
}

impl RoomIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber; returns false if it was already subscribed
    pub fn subscribe(&mut self, topic: &str, id: ConnectionId) -> bool {
        self.rooms.entry(topic.to_string()).or_default().insert(id)
    }

    /// Remove a subscriber; returns false if it was not subscribed
    pub fn unsubscribe(&mut self, topic: &str, id: ConnectionId) -> bool {
        let Some(room) = self.rooms.get_mut(topic) else {
            return false;
        };
        let removed = room.remove(&id);
        if room.is_empty() {
            self.rooms.remove(topic);
        }
        removed
    }

    /// Drop a connection from every listed topic
    pub fn remove_member<'a>(&mut self, id: ConnectionId, topics: impl IntoIterator<Item = &'a String>) {
        for topic in topics {
            self.unsubscribe(topic, id);
        }
    }

    pub fn subscribers(&self, topic: &str) -> Vec<ConnectionId> {
        self.rooms
            .get(topic)
            .map(|room| room.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn topic_count(&self) -> usize {
        self.rooms.len()
    }

    #[cfg(test)]
    pub(crate) fn contains_topic(&self, topic: &str) -> bool {
        self.rooms.contains_key(topic)
    }
}
