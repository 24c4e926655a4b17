use leadline_application::{NavigationService, RedirectGuardService};
use sqlx::PgPool;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub redirect_guard_service: RedirectGuardService,
    pub navigation_service: NavigationService,
    pub postgres_pool: Option<PgPool>,
    pub redis_client: Option<redis::Client>,
    pub redirect_guard_store: &'static str,
    pub frontend_url: String,
    pub demo_auth_enabled: bool,
}
