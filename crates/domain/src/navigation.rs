use leadline_core::AppResult;

use crate::{RedirectDenialReason, RoutePath};

/// Routes involved in the login redirect flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRouteMap {
    login_path: RoutePath,
    dashboard_path: RoutePath,
    public_paths: Vec<RoutePath>,
}

impl AuthRouteMap {
    /// Creates a route map. The login route is always public.
    #[must_use]
    pub fn new(
        login_path: RoutePath,
        dashboard_path: RoutePath,
        public_paths: Vec<RoutePath>,
    ) -> Self {
        Self {
            login_path,
            dashboard_path,
            public_paths,
        }
    }

    /// Route map with `/login`, `/dashboard` and the usual anonymous pages.
    pub fn with_defaults() -> AppResult<Self> {
        Ok(Self::new(
            RoutePath::new("/login")?,
            RoutePath::new("/dashboard")?,
            vec![
                RoutePath::new("/register")?,
                RoutePath::new("/forgot-password")?,
            ],
        ))
    }

    /// Returns the login route.
    #[must_use]
    pub fn login_path(&self) -> &RoutePath {
        &self.login_path
    }

    /// Returns the post-login landing route.
    #[must_use]
    pub fn dashboard_path(&self) -> &RoutePath {
        &self.dashboard_path
    }

    /// Returns whether anonymous visitors may stay on `path`.
    #[must_use]
    pub fn is_public(&self, path: &RoutePath) -> bool {
        path.is_within(&self.login_path)
            || self
                .public_paths
                .iter()
                .any(|public_path| path.is_within(public_path))
    }

    /// Returns the route the browser must move to, if any.
    ///
    /// Signed-in users are sent away from the login page; anonymous visitors
    /// are sent to it from every non-public page.
    #[must_use]
    pub fn required_redirect(
        &self,
        current: &RoutePath,
        authenticated: bool,
    ) -> Option<&RoutePath> {
        if authenticated {
            return current
                .is_within(&self.login_path)
                .then_some(&self.dashboard_path);
        }

        (!self.is_public(current)).then_some(&self.login_path)
    }
}

/// Result of resolving where the browser should be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// The current route is fine.
    Stay,
    /// Navigate to the target.
    Redirect(RoutePath),
    /// A redirect was required but the guard suppressed it.
    Suppressed {
        /// Route that would have been visited.
        target: RoutePath,
        /// Guard rule that blocked it.
        reason: RedirectDenialReason,
    },
}
