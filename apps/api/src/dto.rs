mod auth;
mod common;
mod navigation;
mod redirect_guard;

pub use auth::DemoLoginRequest;
pub use common::{HealthDependencyStatus, HealthResponse, UserIdentityResponse};
pub use navigation::{NavigationResponse, ResolveNavigationRequest};
pub use redirect_guard::{
    RedirectCheckRequest, RedirectCheckResponse, RedirectCountResponse,
    RedirectGuardStatusResponse,
};
