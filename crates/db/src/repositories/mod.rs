use async_trait::async_trait;
use thiserror::Error;

use concierge_core::ConversationState;

pub mod memory;
pub mod state;

pub use memory::InMemoryStateRepository;
pub use state::SqlStateRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Persistence seam for conversation state. The whole state document is
/// saved and loaded atomically, keyed by thread id.
#[async_trait]
pub trait StateRepository: Send + Sync {
    async fn find_by_thread(
        &self,
        thread_id: &str,
    ) -> Result<Option<ConversationState>, RepositoryError>;

    async fn save(&self, state: &ConversationState) -> Result<(), RepositoryError>;
}
