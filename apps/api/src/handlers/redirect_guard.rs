use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use leadline_domain::RoutePath;
use tower_sessions::Session;

use crate::dto::{
    RedirectCheckRequest, RedirectCheckResponse, RedirectCountResponse,
    RedirectGuardStatusResponse,
};
use crate::error::ApiResult;
use crate::redirect_guard_session::session_redirect_guard;
use crate::state::AppState;


/// POST /api/redirect-guard/check - Decide whether a redirect may proceed.
pub async fn check_redirect_handler(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<RedirectCheckRequest>,
) -> ApiResult<Json<RedirectCheckResponse>> {
    let target_path = RoutePath::new(payload.target_path)?;
    let guard = session_redirect_guard(&state, &session).await?;

    let decision = guard.evaluate_redirect(&target_path).await;
    Ok(Json(RedirectCheckResponse::from(decision)))
}

/// POST /api/redirect-guard/reset - Clear the caller's redirect guard.
pub async fn reset_redirect_guard_handler(
    State(state): State<AppState>,
    session: Session,
) -> ApiResult<StatusCode> {
    session_redirect_guard(&state, &session)
        .await?
        .reset()
        .await;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/redirect-guard/status - Read-only guard snapshot with the active policy.
pub async fn redirect_guard_status_handler(
    State(state): State<AppState>,
    session: Session,
) -> ApiResult<Json<RedirectGuardStatusResponse>> {
    let guard = session_redirect_guard(&state, &session).await?;
    let status = guard.status().await;

    Ok(Json(RedirectGuardStatusResponse::new(
        status,
        state.redirect_guard_service.policy(),
    )))
}

/// GET /api/redirect-guard/count - Redirects allowed in the open burst.
pub async fn redirect_count_handler(
    State(state): State<AppState>,
    session: Session,
) -> ApiResult<Json<RedirectCountResponse>> {
    let guard = session_redirect_guard(&state, &session).await?;

    Ok(Json(RedirectCountResponse {
        count: guard.redirect_count().await,
    }))
}
