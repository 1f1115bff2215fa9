use serde::{Deserialize, Serialize};
use validator::Validate;

use super::common::{ActivityKind, GateDecision};

/// Request to start a timed practice session
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    pub activity: ActivityKind,
}

/// Gate decision for a session-start request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionResponse {
    pub decision: GateDecision,
    pub credits: i32,
    pub minutes_available: i32,
    pub minutes_required: i32,
}

/// Request to settle the minutes consumed by a finished session
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FinishSessionRequest {
    pub activity: ActivityKind,

    /// Whole minutes of conversation time used, rounded up by the client.
    #[validate(range(min = 1, max = 180))]
    pub minutes_used: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishSessionResponse {
    pub credits_consumed: i32,
    pub credits: i32,
    pub minutes: i32,
}
