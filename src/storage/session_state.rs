use async_trait::async_trait;

use super::backend::SessionStorage;
use super::schema::Database;
use super::types::StorageError;

impl Database {
    // ========================================================================
    // Session State Operations
    // ========================================================================

    /// Get a stored value by key, or `None` if unset.
    pub async fn get_session_value(&self, key: &str) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM session_state WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(value,)| value))
    }

    /// Insert or replace a value, refreshing its timestamp.
    pub async fn set_session_value(&self, key: &str, value: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO session_state (key, value, updated_at)
            VALUES (?, ?, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn remove_session_value(&self, key: &str) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM session_state WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStorage for Database {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.get_session_value(key).await?)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        Ok(self.set_session_value(key, value).await?)
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        Ok(self.remove_session_value(key).await?)
    }
}
