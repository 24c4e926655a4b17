use serde::Deserialize;
use ts_rs::TS;

/// Incoming payload for demo sign-in.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/demo-login-request.ts"
)]
pub struct DemoLoginRequest {
    pub display_name: String,
    pub email: Option<String>,
}
