use axum::Json;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use leadline_core::{AppError, AppResult, NonEmptyString, UserIdentity};
use tower_sessions::Session;
use tracing::info;
use uuid::Uuid;

use crate::dto::{DemoLoginRequest, UserIdentityResponse};
use crate::error::ApiResult;
use crate::redirect_guard_session::discard_session_redirect_guard;
use crate::state::AppState;

pub const SESSION_USER_KEY: &str = "user_identity";

/// Reads the signed-in identity from the session, if any.
pub async fn session_identity(session: &Session) -> AppResult<Option<UserIdentity>> {
    session
        .get::<UserIdentity>(SESSION_USER_KEY)
        .await
        .map_err(|error| AppError::Internal(format!("failed to read session identity: {error}")))
}

/// POST /auth/demo-login - Sign in without credentials for demos.
pub async fn demo_login_handler(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<DemoLoginRequest>,
) -> ApiResult<Json<UserIdentityResponse>> {
    if !state.demo_auth_enabled {
        return Err(AppError::Forbidden("demo sign-in is disabled".to_owned()).into());
    }

    let display_name = NonEmptyString::new(payload.display_name.trim())?;
    let email = payload
        .email
        .map(|email| email.trim().to_lowercase())
        .filter(|email| !email.is_empty());
    let identity = UserIdentity::new(format!("demo-{}", Uuid::new_v4()), display_name, email);

    session
        .cycle_id()
        .await
        .map_err(|error| AppError::Internal(format!("failed to cycle session id: {error}")))?;

    session
        .insert(SESSION_USER_KEY, &identity)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to persist session identity: {error}"))
        })?;

    info!(subject = identity.subject(), "demo sign-in");

    Ok(Json(UserIdentityResponse::from(identity)))
}

/// POST /auth/logout - Drop the session and its redirect guard record.
pub async fn logout_handler(
    State(state): State<AppState>,
    session: Session,
) -> ApiResult<StatusCode> {
    let subject = session_identity(&session)
        .await?
        .map(|identity| identity.subject().to_owned());

    discard_session_redirect_guard(&state, &session).await?;

    session
        .flush()
        .await
        .map_err(|error| AppError::Internal(format!("failed to flush session: {error}")))?;

    info!(subject = subject.as_deref(), "signed out");

    Ok(StatusCode::NO_CONTENT)
}

/// GET /auth/me - Current identity. Mounted behind `require_auth`.
pub async fn me_handler(
    Extension(identity): Extension<UserIdentity>,
) -> ApiResult<Json<UserIdentityResponse>> {
    Ok(Json(UserIdentityResponse::from(identity)))
}
