use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use redis::AsyncCommands;

use crate::dto::{HealthDependencyStatus, HealthResponse};
use crate::state::AppState;

pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let postgres = check_postgres(state.postgres_pool.clone()).await;
    let redis = check_redis(state.redis_client.clone()).await;

    let ready = is_usable(postgres.status) && is_usable(redis.status);
    let status = if ready { "ok" } else { "degraded" };
    let http_status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        http_status,
        Json(HealthResponse {
            status,
            ready,
            redirect_guard_store: state.redirect_guard_store,
            postgres,
            redis,
        }),
    )
}

async fn check_postgres(pool: Option<sqlx::PgPool>) -> HealthDependencyStatus {
    let Some(pool) = pool else {
        return disabled();
    };

    match sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(&pool).await {
        Ok(_) => ok(),
        Err(error) => failed(format!("postgres check failed: {error}")),
    }
}

async fn check_redis(redis_client: Option<redis::Client>) -> HealthDependencyStatus {
    let Some(redis_client) = redis_client else {
        return disabled();
    };

    let mut connection = match redis_client.get_multiplexed_async_connection().await {
        Ok(connection) => connection,
        Err(error) => return failed(format!("redis connection failed: {error}")),
    };

    match connection.ping::<String>().await {
        Ok(value) if value.eq_ignore_ascii_case("pong") => ok(),
        Ok(value) => failed(format!("unexpected redis ping response: {value}")),
        Err(error) => failed(format!("redis ping failed: {error}")),
    }
}

fn ok() -> HealthDependencyStatus {
    HealthDependencyStatus {
        status: "ok",
        detail: None,
    }
}

fn disabled() -> HealthDependencyStatus {
    HealthDependencyStatus {
        status: "disabled",
        detail: None,
    }
}

fn failed(detail: String) -> HealthDependencyStatus {
    HealthDependencyStatus {
        status: "error",
        detail: Some(detail),
    }
}

fn is_usable(status: &str) -> bool {
    status != "error"
}
