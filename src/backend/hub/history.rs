/**
 * Message History
 *
 * Append-only log of broadcast messages. Its hub-wide entries are replayed
 * to every connection that registers. With a limit configured the oldest entries are dropped first;
 * without one the history grows for the lifetime of the process.
 */

use std::collections::VecDeque;

use crate::shared::Message;

#[derive(Debug, Clone, Default)]
pub(crate) struct History {
    entries: VecDeque<Message>,
    limit: Option<usize>,
}

impl History {
    /// Create a history retaining at most `limit` messages (`None` = unbounded)
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            entries: VecDeque::new(),
            limit,
        }
    }

    /// Append a message, dropping the oldest one if the limit is reached
    pub fn push(&mut self, message: Message) {
        if let Some(limit) = self.limit {
            while self.entries.len() >= limit {
                self.entries.pop_front();
            }
        }
        self.entries.push_back(message);
    }

    /// Messages in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn snapshot(&self) -> Vec<Message> {
        self.entries.iter().cloned().collect()
    }
}
