//! Recent chat messages from other players

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Messages kept before the oldest is dropped
pub const MAX_STORED_MESSAGES: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct StoredMessage {
    pub timestamp: DateTime<Utc>,
    pub username: String,
    pub content: String,
}

/// Bounded, oldest-first store of chat messages
pub struct MessageStore {
    messages: Mutex<VecDeque<StoredMessage>>,
    max_messages: usize,
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageStore {
    pub fn new() -> Self {
        Self::with_capacity(MAX_STORED_MESSAGES)
    }

    pub fn with_capacity(max_messages: usize) -> Self {
        Self {
            messages: Mutex::new(VecDeque::with_capacity(max_messages)),
            max_messages,
        }
    }

    pub fn add_message(&self, username: impl Into<String>, content: impl Into<String>) {
        self.push(StoredMessage {
            timestamp: Utc::now(),
            username: username.into(),
            content: content.into(),
        });
    }

    fn push(&self, message: StoredMessage) {
        let mut messages = self.messages.lock().unwrap_or_else(|p| p.into_inner());
        messages.push_back(message);
        while messages.len() > self.max_messages {
            messages.pop_front();
        }
    }

    /// The last `count` messages, oldest first
    pub fn recent(&self, count: usize) -> Vec<StoredMessage> {
        let messages = self.messages.lock().unwrap_or_else(|p| p.into_inner());
        let skip = messages.len().saturating_sub(count);
        messages.iter().skip(skip).cloned().collect()
    }

    pub fn max_messages(&self) -> usize {
        self.max_messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_drops_oldest_beyond_capacity() {
        let store = MessageStore::new();
        for i in 0..105 {
            store.add_message("Steve", format!("message {}", i));
        }

        let all = store.recent(1000);
        assert_eq!(all.len(), 100);
        assert_eq!(all[0].content, "message 5");
        assert_eq!(all[99].content, "message 104");
    }

    #[test]
    fn test_recent_returns_latest_in_order() {
        let store = MessageStore::new();
        store.add_message("Steve", "first");
        store.add_message("Alex", "second");
        store.add_message("Steve", "third");

        let recent = store.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].username, "Alex");
        assert_eq!(recent[1].content, "third");
        assert!(store.recent(0).is_empty());
    }
}
