mod cors;

use axum::Router;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use leadline_core::AppError;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{auth, handlers, middleware};

/// Builds every route. The session layer is applied by the caller.
pub fn build_router(app_state: AppState) -> Result<Router, AppError> {
    let cors_layer = cors::build_cors_layer(app_state.frontend_url.as_str())?;

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me_handler))
        .route_layer(from_fn(middleware::require_auth));

    let redirect_guard_routes = Router::new()
        .route(
            "/api/navigation/resolve",
            post(handlers::navigation::resolve_navigation_handler),
        )
        .route(
            "/api/redirect-guard/check",
            post(handlers::redirect_guard::check_redirect_handler),
        )
        .route(
            "/api/redirect-guard/reset",
            post(handlers::redirect_guard::reset_redirect_guard_handler),
        )
        .route(
            "/api/redirect-guard/status",
            get(handlers::redirect_guard::redirect_guard_status_handler),
        )
        .route(
            "/api/redirect-guard/count",
            get(handlers::redirect_guard::redirect_count_handler),
        );

    Ok(Router::new()
        .route("/health", get(handlers::health::health_handler))
        .route("/auth/demo-login", post(auth::demo_login_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .merge(redirect_guard_routes)
        .merge(protected_routes)
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_same_origin_for_mutations,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(app_state))
}
