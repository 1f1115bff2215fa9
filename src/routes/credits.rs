use axum::{extract::State, Json};
use tracing::instrument;

use crate::{
    app_state::AppState,
    error::Result,
    middleware::UserIdentity,
    models::credits::{CreditsResponse, TransactionRecord, TransactionsResponse},
};

/// GET /api/v1/credits
#[instrument(skip(state, identity))]
pub async fn get_credits(
    State(state): State<AppState>,
    identity: UserIdentity,
) -> Result<Json<CreditsResponse>> {
    let credits = state.ledger_service.get_balance(identity.user_id).await?;

    Ok(Json(CreditsResponse {
        credits,
        minutes: state.eligibility.minutes_for_credits(credits),
    }))
}

/// GET /api/v1/credits/transactions
#[instrument(skip(state, identity))]
pub async fn list_transactions(
    State(state): State<AppState>,
    identity: UserIdentity,
) -> Result<Json<TransactionsResponse>> {
    let transactions = state
        .ledger_service
        .transactions(identity.user_id)
        .await?
        .into_iter()
        .map(TransactionRecord::from)
        .collect();

    Ok(Json(TransactionsResponse { transactions }))
}
