//! Leadline maintenance worker.
//!
//! Purges redirect guard records that have been idle for a day from the
//! shared Postgres store.

#![forbid(unsafe_code)]

use std::env;
use std::sync::Arc;
use std::time::Duration;

use leadline_application::{RedirectGuardService, SystemClock};
use leadline_core::{AppError, AppResult};
use leadline_domain::RedirectGuardPolicy;
use leadline_infrastructure::PostgresRedirectRecordStore;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_CLEANUP_INTERVAL_SECONDS: u64 = 60 * 60;

#[derive(Debug, Clone)]
struct WorkerConfig {
    database_url: String,
    cleanup_interval_seconds: u64,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = WorkerConfig::load()?;
    let pool = connect_and_migrate(config.database_url.as_str()).await?;
    let redirect_guard_service = RedirectGuardService::new(
        Arc::new(PostgresRedirectRecordStore::new(pool)),
        Arc::new(SystemClock),
        RedirectGuardPolicy::default(),
    );

    info!(
        cleanup_interval_seconds = config.cleanup_interval_seconds,
        "leadline-worker started"
    );

    loop {
        match redirect_guard_service.cleanup().await {
            Ok(purged) => info!(purged, "redirect guard cleanup completed"),
            Err(error) => warn!(error = %error, "redirect guard cleanup failed"),
        }

        tokio::time::sleep(Duration::from_secs(config.cleanup_interval_seconds)).await;
    }
}

async fn connect_and_migrate(database_url: &str) -> AppResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    Ok(pool)
}

impl WorkerConfig {
    fn load() -> AppResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let database_url = lookup("DATABASE_URL")
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| AppError::Validation("DATABASE_URL is required".to_owned()))?;

        let cleanup_interval_seconds = match lookup("CLEANUP_INTERVAL_SECONDS") {
            Some(value) => value.trim().parse::<u64>().map_err(|error| {
                AppError::Validation(format!(
                    "invalid CLEANUP_INTERVAL_SECONDS value '{value}': {error}"
                ))
            })?,
            None => DEFAULT_CLEANUP_INTERVAL_SECONDS,
        };

        if cleanup_interval_seconds == 0 {
            return Err(AppError::Validation(
                "CLEANUP_INTERVAL_SECONDS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            database_url,
            cleanup_interval_seconds,
        })
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
