//! Redirect-loop guard state and decision rules.
//!
//! The guard is a counter with decay. Every allowed redirect stamps the
//! record and bumps the burst counter; once more than the reset window has
//! passed since the last allowed redirect the burst is over and the record
//! behaves as if it were freshly created.

use std::time::Duration;

use leadline_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::RoutePath;

/// Default idle gap after which a burst is considered over.
pub const DEFAULT_RESET_WINDOW: Duration = Duration::from_millis(3_000);

/// Default minimum gap between two redirects to the same target.
pub const DEFAULT_MIN_REPEAT_INTERVAL: Duration = Duration::from_millis(500);

/// Default number of redirects allowed inside one burst.
pub const DEFAULT_MAX_REDIRECTS_PER_WINDOW: u32 = 3;

/// Tunables for the redirect guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedirectGuardPolicy {
    reset_window: Duration,
    min_repeat_interval: Duration,
    max_redirects_per_window: u32,
}

impl RedirectGuardPolicy {
    /// Creates a validated policy.
    pub fn new(
        reset_window: Duration,
        min_repeat_interval: Duration,
        max_redirects_per_window: u32,
    ) -> AppResult<Self> {
        if max_redirects_per_window == 0 {
            return Err(AppError::Validation(
                "max redirects per window must be at least 1".to_owned(),
            ));
        }

        if min_repeat_interval.is_zero() {
            return Err(AppError::Validation(
                "min repeat interval must be greater than zero".to_owned(),
            ));
        }

        if reset_window < min_repeat_interval {
            return Err(AppError::Validation(format!(
                "reset window ({} ms) must not be shorter than the min repeat interval ({} ms)",
                reset_window.as_millis(),
                min_repeat_interval.as_millis()
            )));
        }

        Ok(Self {
            reset_window,
            min_repeat_interval,
            max_redirects_per_window,
        })
    }

    /// Returns the idle gap after which a burst is over.
    #[must_use]
    pub fn reset_window(&self) -> Duration {
        self.reset_window
    }

    /// Returns the minimum gap between redirects to the same target.
    #[must_use]
    pub fn min_repeat_interval(&self) -> Duration {
        self.min_repeat_interval
    }

    /// Returns the number of redirects allowed per burst.
    #[must_use]
    pub fn max_redirects_per_window(&self) -> u32 {
        self.max_redirects_per_window
    }

    fn reset_window_millis(&self) -> i64 {
        duration_millis(self.reset_window)
    }

    fn min_repeat_interval_millis(&self) -> i64 {
        duration_millis(self.min_repeat_interval)
    }
}

impl Default for RedirectGuardPolicy {
    fn default() -> Self {
        Self {
            reset_window: DEFAULT_RESET_WINDOW,
            min_repeat_interval: DEFAULT_MIN_REPEAT_INTERVAL,
            max_redirects_per_window: DEFAULT_MAX_REDIRECTS_PER_WINDOW,
        }
    }
}

/// Why a redirect was suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectDenialReason {
    /// Same target requested again before the min repeat interval passed.
    RapidRepeat,
    /// The burst already used up every allowed redirect.
    BurstLimit,
}

impl RedirectDenialReason {
    /// Returns the stable wire value.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RapidRepeat => "rapid_repeat",
            Self::BurstLimit => "burst_limit",
        }
    }
}

/// Outcome of a redirect permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectDecision {
    /// The caller may navigate.
    Allowed {
        /// Burst count including this redirect.
        consecutive_count: u32,
    },
    /// The caller must not navigate.
    Denied {
        /// Rule that blocked the redirect.
        reason: RedirectDenialReason,
        /// Burst count at the time of the decision.
        consecutive_count: u32,
    },
}

impl RedirectDecision {
    /// Returns whether the redirect may proceed.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }

    /// Returns the burst count observed by the decision.
    #[must_use]
    pub fn consecutive_count(&self) -> u32 {
        match self {
            Self::Allowed { consecutive_count } | Self::Denied { consecutive_count, .. } => {
                *consecutive_count
            }
        }
    }

    /// Returns the denial reason, if any.
    #[must_use]
    pub fn denial_reason(&self) -> Option<RedirectDenialReason> {
        match self {
            Self::Allowed { .. } => None,
            Self::Denied { reason, .. } => Some(*reason),
        }
    }
}

/// Persisted redirect guard state for one browser session.
///
/// Serializes as `{ "count": .., "lastTime": .., "lastPath": .. }` with
/// `lastTime` in milliseconds since the Unix epoch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectRecord {
    #[serde(rename = "count")]
    consecutive_count: u32,
    #[serde(rename = "lastTime")]
    last_redirect_at_millis: i64,
    #[serde(rename = "lastPath")]
    last_target: String,
}

impl RedirectRecord {
    /// Decodes a persisted record.
    pub fn decode(value: &str) -> AppResult<Self> {
        serde_json::from_str(value).map_err(|error| {
            AppError::Validation(format!("invalid redirect guard record: {error}"))
        })
    }

    /// Encodes the record for persistence.
    pub fn encode(&self) -> AppResult<String> {
        serde_json::to_string(self).map_err(|error| {
            AppError::Internal(format!("failed to encode redirect guard record: {error}"))
        })
    }

    /// Returns whether no redirect has been recorded.
    #[must_use]
    pub fn is_initial(&self) -> bool {
        self.consecutive_count == 0 && self.last_target.is_empty()
    }

    /// Returns the stored burst count.
    #[must_use]
    pub fn consecutive_count(&self) -> u32 {
        self.consecutive_count
    }

    /// Returns the instant of the last allowed redirect.
    #[must_use]
    pub fn last_redirect_at_millis(&self) -> Option<i64> {
        (!self.is_initial()).then_some(self.last_redirect_at_millis)
    }

    /// Returns the target of the last allowed redirect.
    #[must_use]
    pub fn last_target(&self) -> Option<&str> {
        (!self.last_target.is_empty()).then_some(self.last_target.as_str())
    }

    /// Returns whether more than the reset window passed since the last
    /// allowed redirect.
    #[must_use]
    pub fn is_burst_expired(&self, now_millis: i64, policy: &RedirectGuardPolicy) -> bool {
        now_millis.saturating_sub(self.last_redirect_at_millis) > policy.reset_window_millis()
    }

    /// Returns the record as it logically stands at `now_millis`.
    ///
    /// An expired burst collapses to the initial record.
    #[must_use]
    pub fn effective(&self, now_millis: i64, policy: &RedirectGuardPolicy) -> Self {
        if self.is_burst_expired(now_millis, policy) {
            Self::default()
        } else {
            self.clone()
        }
    }

    /// Decides whether a redirect to `target` may proceed at `now_millis`.
    ///
    /// The record is only mutated when the redirect is allowed.
    pub fn evaluate(
        &mut self,
        target: &RoutePath,
        now_millis: i64,
        policy: &RedirectGuardPolicy,
    ) -> RedirectDecision {
        let elapsed = now_millis.saturating_sub(self.last_redirect_at_millis);
        let current = self.effective(now_millis, policy);

        if current.last_target == target.as_str() && elapsed < policy.min_repeat_interval_millis()
        {
            return RedirectDecision::Denied {
                reason: RedirectDenialReason::RapidRepeat,
                consecutive_count: current.consecutive_count,
            };
        }

        if current.consecutive_count >= policy.max_redirects_per_window() {
            return RedirectDecision::Denied {
                reason: RedirectDenialReason::BurstLimit,
                consecutive_count: current.consecutive_count,
            };
        }

        let consecutive_count = current.consecutive_count.saturating_add(1);
        *self = Self {
            consecutive_count,
            last_redirect_at_millis: self.last_redirect_at_millis.max(now_millis),
            last_target: target.as_str().to_owned(),
        };

        RedirectDecision::Allowed { consecutive_count }
    }

    /// Builds a read-only status snapshot at `now_millis`.
    #[must_use]
    pub fn status(&self, now_millis: i64, policy: &RedirectGuardPolicy) -> RedirectStatus {
        let window_open = !self.is_initial() && !self.is_burst_expired(now_millis, policy);
        let consecutive_count = if window_open {
            self.consecutive_count
        } else {
            0
        };

        RedirectStatus {
            consecutive_count,
            last_redirect_at_millis: self.last_redirect_at_millis(),
            last_target: self.last_target().map(str::to_owned),
            window_open,
            remaining_redirects: policy
                .max_redirects_per_window()
                .saturating_sub(consecutive_count),
        }
    }
}

/// Diagnostic snapshot of a redirect guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedirectStatus {
    /// Redirects allowed in the open burst, 0 when no burst is open.
    pub consecutive_count: u32,
    /// Instant of the last allowed redirect in epoch milliseconds.
    pub last_redirect_at_millis: Option<i64>,
    /// Target of the last allowed redirect.
    pub last_target: Option<String>,
    /// Whether the last allowed redirect is still within the reset window.
    pub window_open: bool,
    /// Redirects still available before the burst limit applies.
    pub remaining_redirects: u32,
}

fn duration_millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}
