use serde::{Deserialize, Serialize};

/// Timed activity kinds the platform offers. Each kind has its own
/// eligibility threshold because they consume time at different rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    GeneralEnglish,
    MockTest,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GeneralEnglish => "general_english",
            Self::MockTest => "mock_test",
        }
    }
}

/// Outcome of the pre-activity gate check.
///
/// The web app routes on this: onboarding for `ProfileIncomplete`, the
/// purchase flow for `InsufficientBalance`, the activity for `Eligible`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateDecision {
    Eligible,
    InsufficientBalance,
    ProfileIncomplete,
}
