use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::ScanDirection;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct IssueTokenRequest {
    #[validate(length(min = 1, message = "user_id is required"))]
    pub user_id: String,

    #[validate(length(min = 1, message = "event_id is required"))]
    pub event_id: String,

    pub direction: ScanDirection,
}

#[derive(Debug, Serialize)]
pub struct IssueTokenResponse {
    pub token: String,
    pub issued_at_millis: i64,
    pub expires_at_millis: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ScanRequest {
    #[validate(length(min = 1, message = "token is required"))]
    pub token: String,

    /// When set, the scan is rejected unless the token was issued for this
    /// direction (an entry scanner refusing exit codes, and vice versa).
    pub expected_direction: Option<ScanDirection>,
}

#[derive(Debug, Serialize)]
pub struct ScanResponse {
    pub user_id: String,
    pub event_id: String,
    pub direction: ScanDirection,
    pub issued_at_millis: i64,
}
