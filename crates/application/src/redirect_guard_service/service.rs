use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use leadline_core::AppResult;
use leadline_domain::{
    RedirectDecision, RedirectDenialReason, RedirectGuardPolicy, RedirectRecord, RedirectStatus,
    RoutePath,
};

use super::locks::KeyedLocks;
use super::ports::{Clock, RedirectRecordStore};

/// Records untouched for this long are purged by [`RedirectGuardService::cleanup`].
const RECORD_RETENTION_HOURS: i64 = 24;

/// Conditional writes attempted before a contended redirect is suppressed.
const MAX_WRITE_ATTEMPTS: u32 = 8;

/// Application service owning redirect guard state for every session.
#[derive(Clone)]
pub struct RedirectGuardService {
    store: Arc<dyn RedirectRecordStore>,
    clock: Arc<dyn Clock>,
    policy: RedirectGuardPolicy,
    locks: Arc<KeyedLocks>,
}

impl RedirectGuardService {
    /// Creates a new redirect guard service.
    #[must_use]
    pub fn new(
        store: Arc<dyn RedirectRecordStore>,
        clock: Arc<dyn Clock>,
        policy: RedirectGuardPolicy,
    ) -> Self {
        Self {
            store,
            clock,
            policy,
            locks: Arc::new(KeyedLocks::default()),
        }
    }

    /// Returns the configured tunables.
    #[must_use]
    pub fn policy(&self) -> RedirectGuardPolicy {
        self.policy
    }

    /// Returns the guard bound to one storage key.
    #[must_use]
    pub fn guard(&self, storage_key: impl Into<String>) -> RedirectGuard {
        RedirectGuard {
            service: self.clone(),
            storage_key: storage_key.into(),
        }
    }

    /// Removes persisted records untouched for a day. Intended for periodic cleanup.
    pub async fn cleanup(&self) -> AppResult<u64> {
        let cutoff = self.clock.now() - Duration::hours(RECORD_RETENTION_HOURS);
        self.store.purge_idle(cutoff).await
    }

    async fn load_record(&self, storage_key: &str) -> RedirectRecord {
        match self.read_record(storage_key).await {
            Ok((record, _)) => record,
            Err(error) => {
                warn!(
                    storage_key,
                    error = %error,
                    "redirect guard store unavailable, treating record as empty"
                );
                RedirectRecord::default()
            }
        }
    }

    /// Returns the decoded record together with the raw stored value.
    ///
    /// Unreadable values decode to the initial record; the raw value is still
    /// returned so a conditional write can replace it.
    async fn read_record(
        &self,
        storage_key: &str,
    ) -> AppResult<(RedirectRecord, Option<String>)> {
        let Some(stored) = self.store.get(storage_key).await? else {
            return Ok((RedirectRecord::default(), None));
        };

        let record = RedirectRecord::decode(stored.as_str()).unwrap_or_else(|error| {
            warn!(
                storage_key,
                error = %error,
                "discarding unreadable redirect guard record"
            );
            RedirectRecord::default()
        });

        Ok((record, Some(stored)))
    }

    async fn swap_record(
        &self,
        storage_key: &str,
        expected: Option<&str>,
        record: &RedirectRecord,
    ) -> AppResult<bool> {
        let encoded = record.encode()?;
        self.store
            .compare_and_set(storage_key, expected, encoded)
            .await
    }
}

/// Redirect guard for a single browser session.
#[derive(Clone)]
pub struct RedirectGuard {
    service: RedirectGuardService,
    storage_key: String,
}

impl RedirectGuard {
    /// Returns the storage key this guard reads and writes.
    #[must_use]
    pub fn storage_key(&self) -> &str {
        self.storage_key.as_str()
    }

    /// Returns whether a redirect to `target` may proceed now.
    pub async fn should_allow_redirect(&self, target: &RoutePath) -> bool {
        self.evaluate_redirect(target).await.is_allowed()
    }

    /// Returns whether a redirect to `target` may proceed at `now`.
    pub async fn should_allow_redirect_at(&self, target: &RoutePath, now: DateTime<Utc>) -> bool {
        self.evaluate_redirect_at(target, now).await.is_allowed()
    }

    /// Decides a redirect to `target` using the service clock.
    pub async fn evaluate_redirect(&self, target: &RoutePath) -> RedirectDecision {
        let now = self.service.clock.now();
        self.evaluate_redirect_at(target, now).await
    }

    /// Decides a redirect to `target` at `now`.
    ///
    /// An allowed redirect is persisted with a conditional write before
    /// returning; a write lost to another instance re-reads and decides
    /// again. A store that cannot be used is treated as holding no record,
    /// so the guard fails open.
    pub async fn evaluate_redirect_at(
        &self,
        target: &RoutePath,
        now: DateTime<Utc>,
    ) -> RedirectDecision {
        let lock = self.service.locks.lock_for(self.storage_key.as_str());
        let _held = lock.lock().await;

        let policy = self.service.policy;
        let now_millis = now.timestamp_millis();

        for _ in 0..MAX_WRITE_ATTEMPTS {
            let (mut record, stored) =
                match self.service.read_record(self.storage_key.as_str()).await {
                    Ok(loaded) => loaded,
                    Err(error) => {
                        warn!(
                            storage_key = %self.storage_key,
                            error = %error,
                            "redirect guard store unavailable, allowing redirect"
                        );
                        let decision =
                            RedirectRecord::default().evaluate(target, now_millis, &policy);
                        return self.log_decision(target, decision);
                    }
                };

            let decision = record.evaluate(target, now_millis, &policy);
            if !decision.is_allowed() {
                return self.log_decision(target, decision);
            }

            match self
                .service
                .swap_record(self.storage_key.as_str(), stored.as_deref(), &record)
                .await
            {
                Ok(true) => return self.log_decision(target, decision),
                Ok(false) => {
                    debug!(
                        storage_key = %self.storage_key,
                        "redirect guard record changed concurrently, retrying"
                    );
                }
                Err(error) => {
                    warn!(
                        storage_key = %self.storage_key,
                        error = %error,
                        "failed to persist redirect guard record"
                    );
                    return self.log_decision(target, decision);
                }
            }
        }

        warn!(
            storage_key = %self.storage_key,
            attempts = MAX_WRITE_ATTEMPTS,
            "redirect guard record kept changing, suppressing redirect"
        );
        self.log_decision(
            target,
            RedirectDecision::Denied {
                reason: RedirectDenialReason::BurstLimit,
                consecutive_count: policy.max_redirects_per_window(),
            },
        )
    }

    fn log_decision(&self, target: &RoutePath, decision: RedirectDecision) -> RedirectDecision {
        match decision {
            RedirectDecision::Allowed { consecutive_count } => {
                debug!(
                    storage_key = %self.storage_key,
                    target_path = %target,
                    consecutive_count,
                    "redirect allowed"
                );
            }
            RedirectDecision::Denied {
                reason,
                consecutive_count,
            } => {
                warn!(
                    storage_key = %self.storage_key,
                    target_path = %target,
                    reason = reason.as_str(),
                    consecutive_count,
                    "redirect suppressed to break a redirect loop"
                );
            }
        }

        decision
    }

    /// Clears the guard back to its initial state.
    pub async fn reset(&self) {
        let lock = self.service.locks.lock_for(self.storage_key.as_str());
        let _held = lock.lock().await;

        if let Err(error) = self.service.store.remove(self.storage_key.as_str()).await {
            warn!(
                storage_key = %self.storage_key,
                error = %error,
                "failed to reset redirect guard record"
            );
        }
    }

    /// Returns a read-only snapshot of the guard.
    pub async fn status(&self) -> RedirectStatus {
        let record = self.service.load_record(self.storage_key.as_str()).await;
        let now = self.service.clock.now();
        record.status(now.timestamp_millis(), &self.service.policy)
    }

    /// Returns the number of redirects allowed in the open burst.
    pub async fn redirect_count(&self) -> u32 {
        self.status().await.consecutive_count
    }
}
