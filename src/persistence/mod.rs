//! Conversation state persistence
//!
//! The engine reads and writes the dialog stack through [`StackStore`] at
//! every turn boundary, so any backend that can hold a JSON document per
//! conversation can host it. The in-memory implementation stores the
//! serialized form, which makes every save/load exercise the same round trip
//! an external store would.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::DialogError;
use crate::stack::ConversationState;

/// Storage for per-conversation dialog stacks
#[async_trait]
pub trait StackStore: Send + Sync {
    /// Load the state for a conversation, if any was saved
    async fn load(&self, conversation_id: &str) -> Result<Option<ConversationState>, DialogError>;

    /// Save the state for a conversation
    async fn save(
        &self,
        conversation_id: &str,
        state: &ConversationState,
    ) -> Result<(), DialogError>;

    /// Drop the state for a conversation entirely
    async fn clear(&self, conversation_id: &str) -> Result<(), DialogError>;
}

/// In-memory store keyed by conversation id
pub struct InMemoryStackStore {
    states: RwLock<HashMap<String, String>>,
}

impl InMemoryStackStore {
    pub fn new() -> Self {
        Self {
            states: RwLock::new(HashMap::new()),
        }
    }

    /// Number of conversations with saved state
    pub async fn len(&self) -> usize {
        self.states.read().await.len()
    }

    /// Whether no conversation has saved state
    pub async fn is_empty(&self) -> bool {
        self.states.read().await.is_empty()
    }
}

impl Default for InMemoryStackStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StackStore for InMemoryStackStore {
    async fn load(&self, conversation_id: &str) -> Result<Option<ConversationState>, DialogError> {
        let states = self.states.read().await;
        states
            .get(conversation_id)
            .map(|raw| serde_json::from_str(raw).map_err(|e| DialogError::Store(e.to_string())))
            .transpose()
    }

    async fn save(
        &self,
        conversation_id: &str,
        state: &ConversationState,
    ) -> Result<(), DialogError> {
        let raw = serde_json::to_string(state).map_err(|e| DialogError::Store(e.to_string()))?;
        let mut states = self.states.write().await;
        states.insert(conversation_id.to_string(), raw);
        Ok(())
    }

    async fn clear(&self, conversation_id: &str) -> Result<(), DialogError> {
        let mut states = self.states.write().await;
        states.remove(conversation_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::DialogStackFrame;

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let store = InMemoryStackStore::new();
        let mut state = ConversationState::empty();
        state.stack.push(DialogStackFrame::new("laptop", None));

        store.save("conv-1", &state).await.unwrap();
        let loaded = store.load("conv-1").await.unwrap().unwrap();
        assert_eq!(loaded, state);

        store.clear("conv-1").await.unwrap();
        assert!(store.load("conv-1").await.unwrap().is_none());
    }
}
