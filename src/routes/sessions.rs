use axum::{extract::State, Json};
use tracing::{info, instrument};
use validator::Validate;

use crate::{
    app_state::AppState,
    error::{ApiError, Result},
    middleware::UserIdentity,
    models::sessions::{
        FinishSessionRequest, FinishSessionResponse, StartSessionRequest, StartSessionResponse,
    },
};

/// POST /api/v1/sessions/start
///
/// Pre-activity gate: reports whether the user may start the requested
/// timed activity. Routing on the decision (onboarding, purchase flow,
/// or the activity itself) is the web app's job.
#[instrument(skip(state, identity, request))]
pub async fn start_session(
    State(state): State<AppState>,
    identity: UserIdentity,
    Json(request): Json<StartSessionRequest>,
) -> Result<Json<StartSessionResponse>> {
    let account = state.ledger_service.get_account(identity.user_id).await?;

    let decision = state.eligibility.decide(request.activity, account.as_ref());
    let credits = account.map(|a| a.credits).unwrap_or(0);

    info!(
        "Session gate: user={}, activity={}, decision={:?}, credits={}",
        identity.user_id,
        request.activity.as_str(),
        decision,
        credits
    );

    Ok(Json(StartSessionResponse {
        decision,
        credits,
        minutes_available: state.eligibility.minutes_for_credits(credits),
        minutes_required: state.eligibility.required_minutes(request.activity),
    }))
}

/// POST /api/v1/sessions/finish
///
/// Settles the minutes a finished session consumed against the balance.
#[instrument(skip(state, identity, request))]
pub async fn finish_session(
    State(state): State<AppState>,
    identity: UserIdentity,
    Json(request): Json<FinishSessionRequest>,
) -> Result<Json<FinishSessionResponse>> {
    request
        .validate()
        .map_err(|e| ApiError::BadRequest(format!("Validation error: {}", e)))?;

    let credits_consumed = state.eligibility.credits_for_minutes(request.minutes_used);

    let credits = state
        .ledger_service
        .append_consumption(
            identity.user_id,
            credits_consumed,
            request.activity.as_str(),
        )
        .await?;

    Ok(Json(FinishSessionResponse {
        credits_consumed,
        credits,
        minutes: state.eligibility.minutes_for_credits(credits),
    }))
}
