//! Scheduler service endpoint paths.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Token exchange endpoint (password flow).
pub const TOKEN_ENDPOINT: &str = "/api/v1/auth/token";
/// User details endpoint, resolves the numeric user id for an email.
pub const USER_DETAILS_ENDPOINT: &str = "/api/v1/users/details";
/// Scheduled job listing endpoint.
pub const LIST_ENDPOINT: &str = "/api/v1/scheduler/list";
/// Job trigger endpoint.
pub const TRIGGER_ENDPOINT: &str = "/api/v1/scheduler/trigger";

/// Endpoint paths appended to the session host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
#[schemars(description = "Scheduler service endpoint paths, appended to the host")]
pub struct Endpoints {
    /// Token exchange (POST `{email, password}`).
    pub token: String,
    /// User details lookup (POST `{emailId}`).
    pub user_details: String,
    /// Job listing (POST, paged).
    pub list: String,
    /// Job trigger (POST `{jobName, jobId, topic, userId}`).
    pub trigger: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            token: TOKEN_ENDPOINT.to_string(),
            user_details: USER_DETAILS_ENDPOINT.to_string(),
            list: LIST_ENDPOINT.to_string(),
            trigger: TRIGGER_ENDPOINT.to_string(),
        }
    }
}
