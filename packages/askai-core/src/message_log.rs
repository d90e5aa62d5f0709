//! Append-only session transcript.

use crate::types::Message;
use std::sync::Arc;

/// Ordered record of every message in the session.
///
/// Snapshots handed out by [`MessageLog::all`] share storage with the log;
/// the next append copies only when a snapshot is still alive.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    messages: Arc<Vec<Message>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message to the end of the log.
    ///
    /// Timestamps never go backwards: a message stamped earlier than the
    /// current tail (clock adjustment) is re-stamped with the tail's time.
    pub fn append(&mut self, mut message: Message) {
        if let Some(last) = self.messages.last() {
            if message.timestamp < last.timestamp {
                message.timestamp = last.timestamp;
            }
        }
        Arc::make_mut(&mut self.messages).push(message);
    }

    /// Remove every message. Used when a new session starts.
    pub fn clear(&mut self) {
        self.messages = Arc::new(Vec::new());
    }

    /// Snapshot of the log in append order.
    pub fn all(&self) -> Transcript {
        Transcript {
            messages: Arc::clone(&self.messages),
        }
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Immutable view of the log at the moment it was taken. Can be iterated
/// any number of times.
#[derive(Debug, Clone)]
pub struct Transcript {
    messages: Arc<Vec<Message>>,
}

impl Transcript {
    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
