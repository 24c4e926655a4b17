use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use leadline_core::{AppError, AppResult};
use leadline_domain::{RedirectDenialReason, RedirectGuardPolicy, RoutePath};
use tokio::sync::Mutex;

use super::locks::KeyedLocks;
use super::{Clock, RedirectGuardService, RedirectRecordStore};

const BASE_MILLIS: i64 = 1_700_000_000_000;

#[derive(Default)]
struct FakeRedirectRecordStore {
    values: Mutex<HashMap<String, String>>,
    purged_before: Mutex<Option<DateTime<Utc>>>,
}

#[async_trait]
impl RedirectRecordStore for FakeRedirectRecordStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let value = self.values.lock().await.get(key).cloned();
        tokio::task::yield_now().await;
        Ok(value)
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&str>,
        value: String,
    ) -> AppResult<bool> {
        let mut values = self.values.lock().await;
        if values.get(key).map(String::as_str) != expected {
            return Ok(false);
        }

        values.insert(key.to_owned(), value);
        Ok(true)
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        self.values.lock().await.remove(key);
        Ok(())
    }

    async fn purge_idle(&self, before: DateTime<Utc>) -> AppResult<u64> {
        *self.purged_before.lock().await = Some(before);
        Ok(0)
    }
}

struct UnavailableRedirectRecordStore;

#[async_trait]
impl RedirectRecordStore for UnavailableRedirectRecordStore {
    async fn get(&self, _key: &str) -> AppResult<Option<String>> {
        Err(AppError::Internal("store offline".to_owned()))
    }

    async fn compare_and_set(
        &self,
        _key: &str,
        _expected: Option<&str>,
        _value: String,
    ) -> AppResult<bool> {
        Err(AppError::Internal("store offline".to_owned()))
    }

    async fn remove(&self, _key: &str) -> AppResult<()> {
        Err(AppError::Internal("store offline".to_owned()))
    }

    async fn purge_idle(&self, _before: DateTime<Utc>) -> AppResult<u64> {
        Err(AppError::Internal("store offline".to_owned()))
    }
}

/// Store where every conditional write loses to another writer.
struct ContendedRedirectRecordStore;

#[async_trait]
impl RedirectRecordStore for ContendedRedirectRecordStore {
    async fn get(&self, _key: &str) -> AppResult<Option<String>> {
        Ok(None)
    }

    async fn compare_and_set(
        &self,
        _key: &str,
        _expected: Option<&str>,
        _value: String,
    ) -> AppResult<bool> {
        Ok(false)
    }

    async fn remove(&self, _key: &str) -> AppResult<()> {
        Ok(())
    }

    async fn purge_idle(&self, _before: DateTime<Utc>) -> AppResult<u64> {
        Ok(0)
    }
}

struct ManualClock {
    now_millis: AtomicI64,
}

impl ManualClock {
    fn new() -> Self {
        Self {
            now_millis: AtomicI64::new(BASE_MILLIS),
        }
    }

    fn advance(&self, millis: i64) {
        self.now_millis.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        at(self.now_millis.load(Ordering::SeqCst) - BASE_MILLIS)
    }
}

fn at(offset_millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(BASE_MILLIS + offset_millis)
        .single()
        .unwrap_or_default()
}

fn route(value: &str) -> RoutePath {
    match RoutePath::new(value) {
        Ok(route) => route,
        Err(error) => panic!("expected valid route '{value}': {error}"),
    }
}

fn policy() -> RedirectGuardPolicy {
    RedirectGuardPolicy::new(
        StdDuration::from_millis(2_000),
        StdDuration::from_millis(500),
        3,
    )
    .unwrap_or_default()
}

fn build_service() -> (
    RedirectGuardService,
    Arc<FakeRedirectRecordStore>,
    Arc<ManualClock>,
) {
    let store = Arc::new(FakeRedirectRecordStore::default());
    let clock = Arc::new(ManualClock::new());
    let service = RedirectGuardService::new(store.clone(), clock.clone(), policy());
    (service, store, clock)
}

#[tokio::test]
async fn first_redirect_after_reset_is_allowed() {
    let (service, _store, _clock) = build_service();
    let guard = service.guard("session-1");

    guard.reset().await;
    assert!(guard.should_allow_redirect(&route("/login")).await);
    assert_eq!(guard.redirect_count().await, 1);
}

#[tokio::test]
async fn reset_clears_redirect_count() {
    let (service, store, _clock) = build_service();
    let guard = service.guard("session-1");

    assert!(guard.should_allow_redirect(&route("/login")).await);
    guard.reset().await;

    assert_eq!(guard.redirect_count().await, 0);
    assert!(store.values.lock().await.is_empty());
}

#[tokio::test]
async fn rapid_repeat_scenario_denies_second_redirect() {
    let (service, _store, _clock) = build_service();
    let guard = service.guard("session-1");

    assert!(guard.should_allow_redirect_at(&route("/a"), at(0)).await);
    assert!(!guard.should_allow_redirect_at(&route("/a"), at(100)).await);
}

#[tokio::test]
async fn burst_scenario_denies_fourth_redirect_then_recovers() {
    let (service, _store, _clock) = build_service();
    let guard = service.guard("session-1");

    let mut outcomes = Vec::new();
    for (offset, target) in [(0, "/a"), (600, "/b"), (1_100, "/c"), (1_600, "/d")] {
        outcomes.push(guard.should_allow_redirect_at(&route(target), at(offset)).await);
    }
    assert_eq!(outcomes, vec![true, true, true, false]);

    let decision = guard.evaluate_redirect_at(&route("/d"), at(3_700)).await;
    assert!(decision.is_allowed());
    assert_eq!(decision.consecutive_count(), 1);
}

#[tokio::test]
async fn idle_gap_scenario_allows_same_target_again() {
    let (service, _store, _clock) = build_service();
    let guard = service.guard("session-1");

    assert!(guard.should_allow_redirect_at(&route("/a"), at(0)).await);
    assert!(guard.should_allow_redirect_at(&route("/a"), at(2_600)).await);
}

#[tokio::test]
async fn same_target_after_repeat_interval_is_allowed() {
    let (service, _store, clock) = build_service();
    let guard = service.guard("session-1");

    assert!(guard.should_allow_redirect(&route("/dashboard")).await);
    clock.advance(700);
    assert!(guard.should_allow_redirect(&route("/dashboard")).await);
    assert_eq!(guard.redirect_count().await, 2);
}

#[tokio::test]
async fn denial_reports_reason_and_keeps_record() {
    let (service, store, _clock) = build_service();
    let guard = service.guard("session-1");

    assert!(guard.should_allow_redirect_at(&route("/login"), at(0)).await);
    let stored_before = store.values.lock().await.get("session-1").cloned();

    let decision = guard.evaluate_redirect_at(&route("/login"), at(50)).await;
    assert_eq!(
        decision.denial_reason(),
        Some(RedirectDenialReason::RapidRepeat)
    );

    let stored_after = store.values.lock().await.get("session-1").cloned();
    assert_eq!(stored_before, stored_after);
}

#[tokio::test]
async fn corrupted_record_is_treated_as_empty_and_overwritten() {
    let (service, store, _clock) = build_service();
    store
        .values
        .lock()
        .await
        .insert("session-1".to_owned(), "{not json".to_owned());
    let guard = service.guard("session-1");

    assert_eq!(guard.redirect_count().await, 0);
    assert!(guard.should_allow_redirect(&route("/login")).await);

    let stored = store.values.lock().await.get("session-1").cloned();
    assert!(stored.is_some_and(|value| value.contains("\"lastPath\":\"/login\"")));
}

#[tokio::test]
async fn unavailable_store_fails_open() {
    let clock = Arc::new(ManualClock::new());
    let service = RedirectGuardService::new(
        Arc::new(UnavailableRedirectRecordStore),
        clock,
        policy(),
    );
    let guard = service.guard("session-1");

    for _ in 0..5 {
        assert!(guard.should_allow_redirect(&route("/login")).await);
    }
    guard.reset().await;
    assert_eq!(guard.redirect_count().await, 0);
    assert!(service.cleanup().await.is_err());
}

#[tokio::test]
async fn status_is_read_only() {
    let (service, store, clock) = build_service();
    let guard = service.guard("session-1");

    assert!(guard.should_allow_redirect(&route("/leads")).await);
    clock.advance(200);
    let stored_before = store.values.lock().await.clone();

    let status = guard.status().await;
    assert!(status.window_open);
    assert_eq!(status.consecutive_count, 1);
    assert_eq!(status.remaining_redirects, 2);
    assert_eq!(status.last_target.as_deref(), Some("/leads"));
    assert_eq!(status.last_redirect_at_millis, Some(BASE_MILLIS));

    assert_eq!(*store.values.lock().await, stored_before);
}

#[tokio::test]
async fn redirect_count_drops_to_zero_after_window() {
    let (service, _store, clock) = build_service();
    let guard = service.guard("session-1");

    assert!(guard.should_allow_redirect(&route("/login")).await);
    clock.advance(2_500);

    assert_eq!(guard.redirect_count().await, 0);
    assert!(!guard.status().await.window_open);
}

#[tokio::test]
async fn guards_are_isolated_by_storage_key() {
    let (service, _store, _clock) = build_service();
    let first = service.guard("session-1");
    let second = service.guard("session-2");

    assert!(first.should_allow_redirect_at(&route("/login"), at(0)).await);
    assert!(second.should_allow_redirect_at(&route("/login"), at(10)).await);
    assert_eq!(second.storage_key(), "session-2");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_never_exceed_burst_limit() {
    let (service, _store, _clock) = build_service();
    let mut handles = Vec::new();

    for index in 0..12 {
        let guard = service.guard("shared-session");
        handles.push(tokio::spawn(async move {
            guard
                .should_allow_redirect_at(&route(&format!("/tab-{index}")), at(0))
                .await
        }));
    }

    let mut allowed = 0;
    for handle in handles {
        if handle.await.unwrap_or(false) {
            allowed += 1;
        }
    }

    assert_eq!(allowed, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn instances_sharing_a_store_never_exceed_burst_limit() {
    let store = Arc::new(FakeRedirectRecordStore::default());
    let clock = Arc::new(ManualClock::new());
    let first_instance = RedirectGuardService::new(store.clone(), clock.clone(), policy());
    let second_instance = RedirectGuardService::new(store.clone(), clock, policy());
    let mut handles = Vec::new();

    for index in 0..12 {
        let service = if index % 2 == 0 {
            &first_instance
        } else {
            &second_instance
        };
        let guard = service.guard("shared-session");
        handles.push(tokio::spawn(async move {
            guard
                .should_allow_redirect_at(&route(&format!("/tab-{index}")), at(0))
                .await
        }));
    }

    let mut allowed = 0;
    for handle in handles {
        if handle.await.unwrap_or(false) {
            allowed += 1;
        }
    }

    assert_eq!(allowed, 3);
    let stored = store.values.lock().await.get("shared-session").cloned();
    assert!(stored.is_some_and(|value| value.contains("\"count\":3")));
}

#[tokio::test]
async fn persistently_contended_record_suppresses_redirect() {
    let service = RedirectGuardService::new(
        Arc::new(ContendedRedirectRecordStore),
        Arc::new(ManualClock::new()),
        policy(),
    );

    let decision = service
        .guard("session-1")
        .evaluate_redirect_at(&route("/login"), at(0))
        .await;

    assert_eq!(
        decision.denial_reason(),
        Some(RedirectDenialReason::BurstLimit)
    );
}

#[tokio::test]
async fn cleanup_purges_records_older_than_a_day() {
    let (service, store, clock) = build_service();
    clock.advance(1_000);

    assert!(service.cleanup().await.is_ok());
    assert_eq!(
        *store.purged_before.lock().await,
        Some(at(1_000) - Duration::hours(24))
    );
}

#[test]
fn keyed_locks_prune_released_entries() {
    let locks = KeyedLocks::default();

    let first = locks.lock_for("a");
    let again = locks.lock_for("a");
    assert!(Arc::ptr_eq(&first, &again));

    drop(first);
    drop(again);
    let _second = locks.lock_for("b");
    assert_eq!(locks.tracked_keys(), 1);
}
