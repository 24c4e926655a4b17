//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod navigation;
mod redirect_guard;
mod route;

pub use navigation::{AuthRouteMap, NavigationOutcome};
pub use redirect_guard::{
    DEFAULT_MAX_REDIRECTS_PER_WINDOW, DEFAULT_MIN_REPEAT_INTERVAL, DEFAULT_RESET_WINDOW,
    RedirectDecision, RedirectDenialReason, RedirectGuardPolicy, RedirectRecord, RedirectStatus,
};
pub use route::{ROUTE_PATH_MAX_LENGTH, RoutePath};
