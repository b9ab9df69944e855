use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

#[cfg(test)]
mod tests {
    use sqlx::Row;

    use super::run_pending;
    use crate::connect_with_settings;

    #[tokio::test]
    async fn migrations_create_conversation_state_table() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        let count = sqlx::query(
            "SELECT COUNT(*) AS count FROM sqlite_master \
             WHERE type = 'table' AND name = 'conversation_state'",
        )
        .fetch_one(&pool)
        .await
        .expect("check conversation_state table")
        .get::<i64, _>("count");

        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("first run");
        run_pending(&pool).await.expect("second run");
    }
}
