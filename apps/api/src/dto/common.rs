use leadline_core::UserIdentity;
use serde::Serialize;
use ts_rs::TS;

/// Health response payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/health-response.ts"
)]
pub struct HealthResponse {
    pub status: &'static str,
    pub ready: bool,
    pub redirect_guard_store: &'static str,
    pub postgres: HealthDependencyStatus,
    pub redis: HealthDependencyStatus,
}

/// One runtime dependency health status.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/health-dependency-status.ts"
)]
pub struct HealthDependencyStatus {
    pub status: &'static str,
    pub detail: Option<String>,
}

/// API representation of the signed-in user.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/user-identity-response.ts"
)]
pub struct UserIdentityResponse {
    pub subject: String,
    pub display_name: String,
    pub email: Option<String>,
}

impl From<UserIdentity> for UserIdentityResponse {
    fn from(value: UserIdentity) -> Self {
        Self {
            subject: value.subject().to_owned(),
            display_name: value.display_name().to_owned(),
            email: value.email().map(str::to_owned),
        }
    }
}
