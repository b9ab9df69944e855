use std::collections::HashMap;

use tokio::sync::RwLock;

use concierge_core::ConversationState;

use super::{RepositoryError, StateRepository};

/// Map-backed repository for tests and the offline CLI.
#[derive(Default)]
pub struct InMemoryStateRepository {
    states: RwLock<HashMap<String, ConversationState>>,
}

#[async_trait::async_trait]
impl StateRepository for InMemoryStateRepository {
    async fn find_by_thread(
        &self,
        thread_id: &str,
    ) -> Result<Option<ConversationState>, RepositoryError> {
        let states = self.states.read().await;
        Ok(states.get(thread_id).cloned())
    }

    async fn save(&self, state: &ConversationState) -> Result<(), RepositoryError> {
        let mut states = self.states.write().await;
        states.insert(state.thread_id.clone(), state.clone());
        Ok(())
    }
}
