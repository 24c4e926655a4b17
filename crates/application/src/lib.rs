//! Application services and ports.

#![forbid(unsafe_code)]

mod navigation_service;
mod redirect_guard_service;

pub use navigation_service::NavigationService;
pub use redirect_guard_service::{
    Clock, RedirectGuard, RedirectGuardService, RedirectRecordStore, SystemClock,
};
