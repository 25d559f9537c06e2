//! Conversation stage storage.
//!
//! The dispatcher treats stage keys as opaque input and never reads or
//! writes them. A [`StageStore`] is where the caller keeps the current stage
//! of each chat; [`BotRuntime`](crate::BotRuntime) reads it to decide whether
//! an incoming message or callback should be routed as a stage event, and
//! handlers write it to move a conversation along.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::trace;

/// Per-chat stage storage.
pub trait StageStore: Send + Sync {
    /// Returns the current stage of `chat_id`, if any.
    fn get(&self, chat_id: i64) -> Option<String>;

    /// Moves `chat_id` into `stage`.
    fn set(&self, chat_id: i64, stage: String);

    /// Removes the stage of `chat_id`, returning it.
    fn clear(&self, chat_id: i64) -> Option<String>;
}

/// In-memory stage store.
#[derive(Debug, Default)]
pub struct MemoryStageStore {
    stages: RwLock<HashMap<i64, String>>,
}

impl MemoryStageStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of chats with a stage.
    pub fn len(&self) -> usize {
        self.stages.read().len()
    }

    /// Returns `true` if no chat has a stage.
    pub fn is_empty(&self) -> bool {
        self.stages.read().is_empty()
    }
}

impl StageStore for MemoryStageStore {
    fn get(&self, chat_id: i64) -> Option<String> {
        self.stages.read().get(&chat_id).cloned()
    }

    fn set(&self, chat_id: i64, stage: String) {
        trace!(chat_id, stage = %stage, "Entering stage");
        self.stages.write().insert(chat_id, stage);
    }

    fn clear(&self, chat_id: i64) -> Option<String> {
        let previous = self.stages.write().remove(&chat_id);
        if let Some(stage) = &previous {
            trace!(chat_id, stage = %stage, "Leaving stage");
        }
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_clear() {
        let store = MemoryStageStore::new();
        assert!(store.get(1).is_none());

        store.set(1, "ask_name".into());
        store.set(2, "ask_age".into());
        store.set(1, "ask_email".into());

        assert_eq!(store.get(1).as_deref(), Some("ask_email"));
        assert_eq!(store.len(), 2);
        assert_eq!(store.clear(1).as_deref(), Some("ask_email"));
        assert!(store.clear(1).is_none());
        assert_eq!(store.len(), 1);
    }
}
