//! PostgreSQL-backed redirect record store using the `redirect_guard_records` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use leadline_application::RedirectRecordStore;
use leadline_core::{AppError, AppResult};

/// PostgreSQL implementation of the redirect record store port.
#[derive(Clone)]
pub struct PostgresRedirectRecordStore {
    pool: PgPool,
}

impl PostgresRedirectRecordStore {
    /// Creates a store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RedirectRecordStore for PostgresRedirectRecordStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT payload
            FROM redirect_guard_records
            WHERE storage_key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to read redirect guard record: {error}"))
        })
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&str>,
        value: String,
    ) -> AppResult<bool> {
        let result = match expected {
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO redirect_guard_records (storage_key, payload, updated_at)
                    VALUES ($1, $2, now())
                    ON CONFLICT (storage_key) DO NOTHING
                    "#,
                )
                .bind(key)
                .bind(value)
                .execute(&self.pool)
                .await
            }
            Some(expected) => {
                sqlx::query(
                    r#"
                    UPDATE redirect_guard_records
                    SET payload = $3,
                        updated_at = now()
                    WHERE storage_key = $1
                      AND payload = $2
                    "#,
                )
                .bind(key)
                .bind(expected)
                .bind(value)
                .execute(&self.pool)
                .await
            }
        }
        .map_err(|error| {
            AppError::Internal(format!("failed to write redirect guard record: {error}"))
        })?;

        Ok(result.rows_affected() == 1)
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            DELETE FROM redirect_guard_records
            WHERE storage_key = $1
            "#,
        )
        .bind(key)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to remove redirect guard record: {error}"))
        })?;

        Ok(())
    }

    async fn purge_idle(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM redirect_guard_records
            WHERE updated_at < $1
            "#,
        )
        .bind(before)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to purge idle redirect guard records: {error}"))
        })?;

        Ok(result.rows_affected())
    }
}
