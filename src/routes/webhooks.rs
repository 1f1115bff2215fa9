use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use tracing::{debug, info, instrument, warn};

use crate::{
    app_state::AppState,
    error::{ApiError, Result},
    models::webhooks::{CheckoutSession, RefundedCharge, StripeEvent, WebhookAck},
};

/// POST /api/v1/webhooks/stripe
///
/// Stripe delivers at-least-once and retries on every non-2xx, so the
/// response contract is strict: verification and validation failures are
/// 4xx (retrying cannot help), storage trouble is 5xx (retrying will),
/// and duplicates are 2xx successes.
#[instrument(skip(state, headers, body))]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            ApiError::InvalidSignature("missing Stripe-Signature header".to_string())
        })?;

    state.stripe_service.verify_signature(&body, signature)?;

    let event: StripeEvent = serde_json::from_slice(&body)
        .map_err(|e| ApiError::MalformedEvent(format!("undecodable event envelope: {}", e)))?;

    info!(
        "Received Stripe event: id={}, type={}",
        event.id, event.event_type
    );

    match event.event_type.as_str() {
        "checkout.session.completed" => handle_checkout_completed(&state, event.data.object).await,
        "charge.refunded" => handle_charge_refunded(&state, event.data.object).await,
        other => {
            debug!("Ignoring unhandled Stripe event type: {}", other);
            Ok(Json(WebhookAck::ignored()))
        }
    }
}

/// Settle a completed checkout: credit the purchased package exactly once.
async fn handle_checkout_completed(
    state: &AppState,
    object: serde_json::Value,
) -> Result<Json<WebhookAck>> {
    let session: CheckoutSession = serde_json::from_value(object)
        .map_err(|e| ApiError::MalformedEvent(format!("undecodable checkout session: {}", e)))?;

    // Completed sessions can arrive unpaid (async payment methods);
    // the paid event follows later under the same session id.
    if session.payment_status.as_deref() != Some("paid") {
        info!(
            "Checkout session {} not paid yet (status: {:?}), skipping",
            session.id, session.payment_status
        );
        return Ok(Json(WebhookAck::ignored()));
    }

    let settlement = session.into_settlement(&state.config.packages)?;
    let outcome = state.ledger_service.append_settlement(&settlement).await?;

    if outcome.applied {
        info!(
            "Settlement applied: reference={}, user={}, credits=+{}, balance={}",
            settlement.external_reference, settlement.user_id, settlement.credits,
            outcome.credits_after
        );
        Ok(Json(WebhookAck::ok()))
    } else {
        info!(
            "Settlement already processed: reference={}, transaction={}",
            settlement.external_reference, outcome.transaction_id
        );
        Ok(Json(WebhookAck::duplicate()))
    }
}

/// Reverse the purchase behind a refunded charge, if we ever credited it.
async fn handle_charge_refunded(
    state: &AppState,
    object: serde_json::Value,
) -> Result<Json<WebhookAck>> {
    let charge: RefundedCharge = serde_json::from_value(object)
        .map_err(|e| ApiError::MalformedEvent(format!("undecodable charge: {}", e)))?;

    let Some(payment_intent) = charge.payment_intent else {
        warn!("Refunded charge {} has no payment_intent, ignoring", charge.id);
        return Ok(Json(WebhookAck::ignored()));
    };

    match state
        .ledger_service
        .refund_by_payment_intent(&payment_intent, &charge.id)
        .await?
    {
        None => {
            // A refund for a payment we never settled: nothing to reverse
            warn!(
                "Refund for unknown payment intent {} (charge {}), ignoring",
                payment_intent, charge.id
            );
            Ok(Json(WebhookAck::ignored()))
        }
        Some(outcome) if outcome.applied => {
            info!(
                "Refund applied: charge={}, user={}, credits=-{}, balance={}",
                charge.id, outcome.user_id, outcome.credits_refunded, outcome.credits_after
            );
            Ok(Json(WebhookAck::ok()))
        }
        Some(outcome) => {
            info!(
                "Refund already processed: charge={}, user={}",
                charge.id, outcome.user_id
            );
            Ok(Json(WebhookAck::duplicate()))
        }
    }
}
