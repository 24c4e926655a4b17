use std::sync::Arc;
use std::time::Duration;

use leadline_application::{
    NavigationService, RedirectGuardService, RedirectRecordStore, SystemClock,
};
use leadline_core::{AppError, AppResult};
use leadline_infrastructure::{
    InMemoryRedirectRecordStore, PostgresRedirectRecordStore, RedisRedirectRecordStore,
};
use sqlx::PgPool;
use tracing::{info, warn};

use crate::api_config::{ApiConfig, RedirectGuardStoreConfig};
use crate::state::AppState;

const IN_MEMORY_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

pub fn build_app_state(
    config: &ApiConfig,
    postgres_pool: Option<PgPool>,
    redis_client: Option<redis::Client>,
) -> AppResult<AppState> {
    let store = build_redirect_record_store(config, postgres_pool.clone(), redis_client.clone())?;
    let redirect_guard_service =
        RedirectGuardService::new(store, Arc::new(SystemClock), config.redirect_guard_policy);
    let navigation_service =
        NavigationService::new(redirect_guard_service.clone(), config.route_map.clone());

    Ok(AppState {
        redirect_guard_service,
        navigation_service,
        postgres_pool,
        redis_client,
        redirect_guard_store: config.redirect_guard_store.as_str(),
        frontend_url: config.frontend_url.clone(),
        demo_auth_enabled: config.demo_auth_enabled,
    })
}

/// Periodically purges idle records when they live in this process.
///
/// Shared stores are cleaned by the worker or by key expiry instead.
pub fn spawn_in_memory_cleanup(state: &AppState, config: &ApiConfig) {
    if config.redirect_guard_store != RedirectGuardStoreConfig::InMemory {
        return;
    }

    let service = state.redirect_guard_service.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(IN_MEMORY_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            match service.cleanup().await {
                Ok(0) => {}
                Ok(purged) => info!(purged, "purged idle redirect guard records"),
                Err(error) => warn!(error = %error, "failed to purge redirect guard records"),
            }
        }
    });
}

fn build_redirect_record_store(
    config: &ApiConfig,
    postgres_pool: Option<PgPool>,
    redis_client: Option<redis::Client>,
) -> AppResult<Arc<dyn RedirectRecordStore>> {
    match config.redirect_guard_store {
        RedirectGuardStoreConfig::InMemory => Ok(Arc::new(InMemoryRedirectRecordStore::new())),
        RedirectGuardStoreConfig::Redis => {
            let redis_client = redis_client.ok_or_else(|| {
                AppError::Validation(
                    "REDIS_URL is required when REDIRECT_GUARD_STORE=redis".to_owned(),
                )
            })?;
            Ok(Arc::new(RedisRedirectRecordStore::new(
                redis_client,
                "leadline:redirect_guard",
                config.redirect_guard_record_ttl_seconds,
            )))
        }
        RedirectGuardStoreConfig::Postgres => {
            let pool = postgres_pool.ok_or_else(|| {
                AppError::Validation(
                    "DATABASE_URL is required when REDIRECT_GUARD_STORE=postgres".to_owned(),
                )
            })?;
            Ok(Arc::new(PostgresRedirectRecordStore::new(pool)))
        }
    }
}
