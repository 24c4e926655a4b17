use leadline_domain::NavigationOutcome;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Incoming payload for navigation resolution.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/resolve-navigation-request.ts"
)]
pub struct ResolveNavigationRequest {
    pub current_path: String,
}

/// Where the browser should go next.
///
/// `action` is one of `stay`, `redirect` or `suppressed`. A suppressed
/// redirect carries the guard rule in `reason`; the client must not navigate.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/navigation-response.ts"
)]
pub struct NavigationResponse {
    pub action: &'static str,
    pub target_path: Option<String>,
    pub reason: Option<&'static str>,
}

impl From<NavigationOutcome> for NavigationResponse {
    fn from(value: NavigationOutcome) -> Self {
        match value {
            NavigationOutcome::Stay => Self {
                action: "stay",
                target_path: None,
                reason: None,
            },
            NavigationOutcome::Redirect(target) => Self {
                action: "redirect",
                target_path: Some(target.into()),
                reason: None,
            },
            NavigationOutcome::Suppressed { target, reason } => Self {
                action: "suppressed",
                target_path: Some(target.into()),
                reason: Some(reason.as_str()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use leadline_domain::{NavigationOutcome, RedirectDenialReason, RoutePath};

    use super::NavigationResponse;

    fn route(value: &str) -> RoutePath {
        match RoutePath::new(value) {
            Ok(route) => route,
            Err(error) => panic!("expected valid route '{value}': {error}"),
        }
    }

    #[test]
    fn stay_has_no_target() {
        let response = NavigationResponse::from(NavigationOutcome::Stay);
        assert_eq!(response.action, "stay");
        assert!(response.target_path.is_none());
    }

    #[test]
    fn suppressed_redirect_reports_reason() {
        let response = NavigationResponse::from(NavigationOutcome::Suppressed {
            target: route("/login"),
            reason: RedirectDenialReason::BurstLimit,
        });

        assert_eq!(response.action, "suppressed");
        assert_eq!(response.target_path.as_deref(), Some("/login"));
        assert_eq!(response.reason, Some("burst_limit"));
    }

    #[test]
    fn redirect_reports_target() {
        let response = NavigationResponse::from(NavigationOutcome::Redirect(route("/dashboard")));
        assert_eq!(response.action, "redirect");
        assert_eq!(response.target_path.as_deref(), Some("/dashboard"));
        assert!(response.reason.is_none());
    }
}
