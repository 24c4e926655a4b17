use chrono::DateTime;
use leadline_domain::{RedirectDecision, RedirectGuardPolicy, RedirectStatus};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Incoming payload asking whether a redirect may proceed.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/redirect-check-request.ts"
)]
pub struct RedirectCheckRequest {
    pub target_path: String,
}

/// Redirect guard decision.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/redirect-check-response.ts"
)]
pub struct RedirectCheckResponse {
    pub allowed: bool,
    pub reason: Option<&'static str>,
    pub consecutive_count: u32,
}

impl From<RedirectDecision> for RedirectCheckResponse {
    fn from(value: RedirectDecision) -> Self {
        Self {
            allowed: value.is_allowed(),
            reason: value.denial_reason().map(|reason| reason.as_str()),
            consecutive_count: value.consecutive_count(),
        }
    }
}

/// Diagnostic snapshot of the caller's redirect guard.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/redirect-guard-status-response.ts"
)]
pub struct RedirectGuardStatusResponse {
    pub consecutive_count: u32,
    pub last_redirect_at: Option<String>,
    pub last_target: Option<String>,
    pub window_open: bool,
    pub remaining_redirects: u32,
    pub max_redirects_per_window: u32,
    #[ts(type = "number")]
    pub reset_window_ms: u64,
    #[ts(type = "number")]
    pub min_repeat_interval_ms: u64,
}

impl RedirectGuardStatusResponse {
    pub fn new(status: RedirectStatus, policy: RedirectGuardPolicy) -> Self {
        Self {
            consecutive_count: status.consecutive_count,
            last_redirect_at: status
                .last_redirect_at_millis
                .and_then(DateTime::from_timestamp_millis)
                .map(|instant| instant.to_rfc3339()),
            last_target: status.last_target,
            window_open: status.window_open,
            remaining_redirects: status.remaining_redirects,
            max_redirects_per_window: policy.max_redirects_per_window(),
            reset_window_ms: duration_millis(policy.reset_window()),
            min_repeat_interval_ms: duration_millis(policy.min_repeat_interval()),
        }
    }
}

/// Redirects allowed in the caller's open burst.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/redirect-count-response.ts"
)]
pub struct RedirectCountResponse {
    pub count: u32,
}

fn duration_millis(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
