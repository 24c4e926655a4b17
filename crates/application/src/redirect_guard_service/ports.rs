use async_trait::async_trait;
use chrono::{DateTime, Utc};

use leadline_core::AppResult;

/// Key-value port holding encoded redirect guard records.
///
/// Values are opaque strings so that unreadable entries can still be
/// loaded and replaced by the service. Writes are conditional so that
/// several API instances sharing one backend cannot both extend a burst.
#[async_trait]
pub trait RedirectRecordStore: Send + Sync {
    /// Returns the stored value for `key`, if any.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Atomically stores `value` under `key` if the current value still
    /// equals `expected` (`None` meaning no value is stored).
    ///
    /// Returns `false` without writing when another writer got there first.
    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&str>,
        value: String,
    ) -> AppResult<bool>;

    /// Removes the value stored under `key`. Missing keys are not an error.
    async fn remove(&self, key: &str) -> AppResult<()>;

    /// Removes values last written before the given cutoff.
    async fn purge_idle(&self, before: DateTime<Utc>) -> AppResult<u64>;
}

/// Time source for guard decisions.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
