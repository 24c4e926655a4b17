//! Redis-backed redirect record store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use leadline_application::RedirectRecordStore;
use leadline_core::{AppError, AppResult};
use redis::{AsyncCommands, Script};

const COMPARE_AND_SET_SCRIPT: &str = r#"
local key = KEYS[1]
local has_expected = ARGV[1]
local expected = ARGV[2]
local value = ARGV[3]
local ttl = tonumber(ARGV[4])

local current = redis.call('GET', key)

if has_expected == '1' then
  if current ~= expected then
    return 0
  end
elseif current then
  return 0
end

redis.call('SET', key, value, 'EX', ttl)
return 1
"#;

/// Redis implementation of the redirect record store port.
#[derive(Clone)]
pub struct RedisRedirectRecordStore {
    client: redis::Client,
    key_prefix: String,
    record_ttl_seconds: u64,
}

impl RedisRedirectRecordStore {
    /// Creates a store with a configured Redis client, key prefix and record TTL.
    #[must_use]
    pub fn new(
        client: redis::Client,
        key_prefix: impl Into<String>,
        record_ttl_seconds: u64,
    ) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
            record_ttl_seconds: record_ttl_seconds.max(1),
        }
    }

    fn key_for(&self, key: &str) -> String {
        format!("{}:{key}", self.key_prefix)
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| AppError::Internal(format!("failed to connect to redis: {error}")))
    }
}

#[async_trait]
impl RedirectRecordStore for RedisRedirectRecordStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut connection = self.connection().await?;

        connection.get(self.key_for(key)).await.map_err(|error| {
            AppError::Internal(format!("failed to read redirect guard record: {error}"))
        })
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&str>,
        value: String,
    ) -> AppResult<bool> {
        let mut connection = self.connection().await?;

        let script = Script::new(COMPARE_AND_SET_SCRIPT);
        let written: i64 = script
            .key(self.key_for(key))
            .arg(if expected.is_some() { "1" } else { "0" })
            .arg(expected.unwrap_or_default())
            .arg(value)
            .arg(self.record_ttl_seconds)
            .invoke_async(&mut connection)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to write redirect guard record: {error}"))
            })?;

        Ok(written == 1)
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        let mut connection = self.connection().await?;

        connection
            .del::<_, i64>(self.key_for(key))
            .await
            .map(|_| ())
            .map_err(|error| {
                AppError::Internal(format!("failed to remove redirect guard record: {error}"))
            })
    }

    async fn purge_idle(&self, _before: DateTime<Utc>) -> AppResult<u64> {
        // Redis redirect guard keys expire automatically via TTL.
        Ok(0)
    }
}
