use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use leadline_application::RedirectRecordStore;
use leadline_core::AppResult;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct StoredRedirectRecord {
    value: String,
    updated_at: DateTime<Utc>,
}

/// In-process redirect record store for single-instance deployments and tests.
#[derive(Default)]
pub struct InMemoryRedirectRecordStore {
    entries: RwLock<HashMap<String, StoredRedirectRecord>>,
}

impl InMemoryRedirectRecordStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored records.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns whether the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl RedirectRecordStore for InMemoryRedirectRecordStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self
            .entries
            .read()
            .await
            .get(key)
            .map(|entry| entry.value.clone()))
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&str>,
        value: String,
    ) -> AppResult<bool> {
        let mut entries = self.entries.write().await;
        let current = entries.get(key).map(|entry| entry.value.as_str());
        if current != expected {
            return Ok(false);
        }

        entries.insert(
            key.to_owned(),
            StoredRedirectRecord {
                value,
                updated_at: Utc::now(),
            },
        );

        Ok(true)
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn purge_idle(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let mut entries = self.entries.write().await;
        let previous_len = entries.len();
        entries.retain(|_, entry| entry.updated_at >= before);

        Ok(u64::try_from(previous_len - entries.len()).unwrap_or(u64::MAX))
    }
}
