//! Leadline API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod api_services;
mod auth;
mod dto;
mod error;
mod handlers;
mod middleware;
mod redirect_guard_session;
mod state;

use leadline_core::AppError;
use tracing::info;

use crate::api_config::{ApiConfig, SessionStoreConfig, init_tracing};
use crate::api_services::{
    build_app_state, build_memory_session_layer, build_postgres_session_layer,
    build_redis_client, connect_and_migrate, spawn_in_memory_cleanup,
};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;

    let postgres_pool = match config.database_url.as_deref() {
        Some(database_url) => Some(connect_and_migrate(database_url).await?),
        None => None,
    };

    if config.migrate_only {
        info!("database migrations applied successfully");
        return Ok(());
    }

    let redis_client = config
        .redis_url
        .as_deref()
        .map(build_redis_client)
        .transpose()?;

    let app_state = build_app_state(&config, postgres_pool.clone(), redis_client)?;
    spawn_in_memory_cleanup(&app_state, &config);
    let router = api_router::build_router(app_state)?;

    let address = config.socket_address()?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(
        %address,
        redirect_guard_store = config.redirect_guard_store.as_str(),
        "leadline-api listening"
    );

    let served = match config.session_store {
        SessionStoreConfig::Memory => {
            let session_layer = build_memory_session_layer(config.cookie_secure);
            axum::serve(listener, router.layer(session_layer)).await
        }
        SessionStoreConfig::Postgres => {
            let pool = postgres_pool.ok_or_else(|| {
                AppError::Validation(
                    "DATABASE_URL is required when SESSION_STORE=postgres".to_owned(),
                )
            })?;
            let session_layer = build_postgres_session_layer(pool, config.cookie_secure).await?;
            axum::serve(listener, router.layer(session_layer)).await
        }
    };

    served.map_err(|error| AppError::Internal(format!("api server error: {error}")))
}
