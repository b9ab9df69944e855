use sqlx::Row;

use concierge_core::ConversationState;

use super::{RepositoryError, StateRepository};
use crate::DbPool;

pub struct SqlStateRepository {
    pool: DbPool,
}

impl SqlStateRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl StateRepository for SqlStateRepository {
    async fn find_by_thread(
        &self,
        thread_id: &str,
    ) -> Result<Option<ConversationState>, RepositoryError> {
        let row = sqlx::query("SELECT state FROM conversation_state WHERE thread_id = ?1")
            .bind(thread_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let raw: String = row.get("state");
                let state = serde_json::from_str(&raw)
                    .map_err(|err| RepositoryError::Decode(err.to_string()))?;
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, state: &ConversationState) -> Result<(), RepositoryError> {
        let document = serde_json::to_string(state)
            .map_err(|err| RepositoryError::Decode(err.to_string()))?;

        sqlx::query(
            "INSERT INTO conversation_state (thread_id, state) VALUES (?1, ?2) \
             ON CONFLICT (thread_id) DO UPDATE \
             SET state = excluded.state, updated_at = datetime('now')",
        )
        .bind(&state.thread_id)
        .bind(document)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use concierge_core::{ActionDescriptor, ApprovalStatus, ConversationState};

    use crate::connect_with_settings;
    use crate::migrations::run_pending;
    use crate::repositories::{SqlStateRepository, StateRepository};

    async fn repository() -> SqlStateRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");
        SqlStateRepository::new(pool)
    }

    #[tokio::test]
    async fn missing_thread_returns_none() {
        let repo = repository().await;
        let found = repo.find_by_thread("no-such-thread").await.expect("query");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn state_round_trips_including_pending_action() {
        let repo = repository().await;

        let mut state = ConversationState::new("thread-42");
        state.push_user("I want to launch a loyalty offer");
        state.push_assistant("Let's set a goal first.");
        state.pending_action = Some(ActionDescriptor {
            action_name: "launchOffer".to_string(),
            parameters: serde_json::json!({"offerName": "Loyalty Boost"}),
            description: "Launch the configured offer".to_string(),
        });
        state.requires_approval = true;
        state.approval = ApprovalStatus::Pending;

        repo.save(&state).await.expect("save");
        let loaded = repo.find_by_thread("thread-42").await.expect("load").expect("present");

        assert_eq!(loaded, state);
        assert_eq!(
            loaded.pending_action.as_ref().map(|a| a.action_name.as_str()),
            Some("launchOffer")
        );
    }

    #[tokio::test]
    async fn save_upserts_on_the_same_thread() {
        let repo = repository().await;

        let mut state = ConversationState::new("thread-7");
        state.push_user("hello");
        repo.save(&state).await.expect("first save");

        state.push_assistant("hi there");
        repo.save(&state).await.expect("second save");

        let loaded = repo.find_by_thread("thread-7").await.expect("load").expect("present");
        assert_eq!(loaded.messages().len(), 2);
    }
}
