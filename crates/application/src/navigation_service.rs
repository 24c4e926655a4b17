//! Login redirect flow.
//!
//! Decides where the browser belongs given the current route and the session
//! identity, and asks the redirect guard before sending it anywhere.

use std::sync::Arc;

use tracing::info;

use leadline_core::UserIdentity;
use leadline_domain::{AuthRouteMap, NavigationOutcome, RedirectDecision, RoutePath};

use crate::RedirectGuardService;


/// Application service resolving login and dashboard redirects.
#[derive(Clone)]
pub struct NavigationService {
    redirect_guard_service: RedirectGuardService,
    routes: Arc<AuthRouteMap>,
}

impl NavigationService {
    /// Creates a new navigation service.
    #[must_use]
    pub fn new(redirect_guard_service: RedirectGuardService, routes: AuthRouteMap) -> Self {
        Self {
            redirect_guard_service,
            routes: Arc::new(routes),
        }
    }

    /// Returns the configured route map.
    #[must_use]
    pub fn routes(&self) -> &AuthRouteMap {
        &self.routes
    }

    /// Resolves the navigation for a session currently on `current_path`.
    pub async fn resolve(
        &self,
        guard_key: &str,
        current_path: &RoutePath,
        actor: Option<&UserIdentity>,
    ) -> NavigationOutcome {
        let Some(target) = self
            .routes
            .required_redirect(current_path, actor.is_some())
        else {
            return NavigationOutcome::Stay;
        };

        let decision = self
            .redirect_guard_service
            .guard(guard_key)
            .evaluate_redirect(target)
            .await;

        match decision {
            RedirectDecision::Allowed { .. } => {
                info!(
                    from = %current_path,
                    to = %target,
                    subject = actor.map(UserIdentity::subject),
                    "navigation redirect issued"
                );
                NavigationOutcome::Redirect(target.clone())
            }
            RedirectDecision::Denied { reason, .. } => NavigationOutcome::Suppressed {
                target: target.clone(),
                reason,
            },
        }
    }
}
