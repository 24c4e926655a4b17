//! Redirect-loop guard ports and application service.
//!
//! Stops login <-> dashboard redirect cycles caused by authentication checks
//! racing with route guards. Each browser session owns one persisted
//! [`leadline_domain::RedirectRecord`] addressed by a storage key; the
//! service serializes read-modify-write cycles per key.

mod locks;
mod ports;
mod service;

#[cfg(test)]
mod tests;

pub use ports::{Clock, RedirectRecordStore, SystemClock};
pub use service::{RedirectGuard, RedirectGuardService};
