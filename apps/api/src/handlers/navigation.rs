use axum::Json;
use axum::extract::State;
use leadline_domain::RoutePath;
use tower_sessions::Session;

use crate::auth::session_identity;
use crate::dto::{NavigationResponse, ResolveNavigationRequest};
use crate::error::ApiResult;
use crate::redirect_guard_session::redirect_guard_key;
use crate::state::AppState;


/// POST /api/navigation/resolve - Where the caller's browser should be.
pub async fn resolve_navigation_handler(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<ResolveNavigationRequest>,
) -> ApiResult<Json<NavigationResponse>> {
    let current_path = RoutePath::new(payload.current_path)?;
    let guard_key = redirect_guard_key(&session).await?;
    let actor = session_identity(&session).await?;

    let outcome = state
        .navigation_service
        .resolve(guard_key.as_str(), &current_path, actor.as_ref())
        .await;

    Ok(Json(NavigationResponse::from(outcome)))
}
