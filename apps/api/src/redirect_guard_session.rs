use leadline_application::RedirectGuard;
use leadline_core::{AppError, AppResult};
use tower_sessions::Session;
use uuid::Uuid;

use crate::state::AppState;

/// Session entry holding the key of the session's redirect guard record.
pub const SESSION_REDIRECT_GUARD_KEY: &str = "redirect_guard_key";

async fn existing_redirect_guard_key(session: &Session) -> AppResult<Option<String>> {
    session
        .get::<String>(SESSION_REDIRECT_GUARD_KEY)
        .await
        .map_err(|error| AppError::Internal(format!("failed to read redirect guard key: {error}")))
}

/// Returns the redirect guard key for the session, creating one on first use.
pub async fn redirect_guard_key(session: &Session) -> AppResult<String> {
    if let Some(existing) = existing_redirect_guard_key(session).await? {
        return Ok(existing);
    }

    let key = Uuid::new_v4().to_string();
    session
        .insert(SESSION_REDIRECT_GUARD_KEY, &key)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to persist redirect guard key: {error}"))
        })?;

    Ok(key)
}

/// Returns the redirect guard bound to the caller's session.
pub async fn session_redirect_guard(
    state: &AppState,
    session: &Session,
) -> AppResult<RedirectGuard> {
    let key = redirect_guard_key(session).await?;
    Ok(state.redirect_guard_service.guard(key))
}

/// Drops the persisted guard record of the session, if it ever had one.
pub async fn discard_session_redirect_guard(state: &AppState, session: &Session) -> AppResult<()> {
    if let Some(key) = existing_redirect_guard_key(session).await? {
        state.redirect_guard_service.guard(key).reset().await;
    }

    Ok(())
}
