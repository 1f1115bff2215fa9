use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::PackageConfig,
    error::{ApiError, Result},
};

/// Stripe webhook envelope. `data.object` stays untyped until the event
/// type is known.
#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    /// Event type discriminator, e.g. "checkout.session.completed".
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event id (evt_...).
    pub id: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

/// The slice of a Stripe checkout session the settlement path consumes
#[derive(Debug, Deserialize)]
pub struct CheckoutSession {
    /// Session id (cs_...); doubles as the settlement idempotency key.
    pub id: String,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub payment_intent: Option<String>,
    /// Metadata attached when the web app created the session:
    /// user_id, package_name, credits.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// The slice of a refunded Stripe charge the refund path consumes
#[derive(Debug, Deserialize)]
pub struct RefundedCharge {
    /// Charge id (ch_...); doubles as the refund idempotency key.
    pub id: String,
    #[serde(default)]
    pub payment_intent: Option<String>,
}

/// A verified, validated settlement ready for the ledger
#[derive(Debug, Clone)]
pub struct SettlementEvent {
    pub user_id: Uuid,
    pub external_reference: String,
    pub credits: i32,
    pub package_name: Option<String>,
    pub price_cents: Option<i64>,
    pub currency: Option<String>,
    pub payment_intent: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl CheckoutSession {
    /// Validate session metadata and build the settlement event.
    ///
    /// The credit amount is re-derived from the package catalog when the
    /// package is known; the metadata value is only a fallback, since
    /// session metadata originates client-side and could be stale or
    /// tampered with. A missing or non-positive amount is a permanent
    /// failure: the event will never change, so the sender must not retry.
    pub fn into_settlement(
        self,
        packages: &HashMap<String, PackageConfig>,
    ) -> Result<SettlementEvent> {
        let user_id = self
            .metadata
            .get("user_id")
            .ok_or_else(|| {
                ApiError::MalformedEvent(format!("session {} has no user_id metadata", self.id))
            })?
            .parse::<Uuid>()
            .map_err(|_| {
                ApiError::MalformedEvent(format!("session {} has a non-UUID user_id", self.id))
            })?;

        let package_name = self.metadata.get("package_name").cloned();
        let metadata_credits = self
            .metadata
            .get("credits")
            .and_then(|s| s.parse::<i32>().ok());

        let credits = match package_name.as_deref().and_then(|n| packages.get(n)) {
            Some(package) => {
                if metadata_credits.is_some_and(|c| c != package.credits) {
                    tracing::warn!(
                        session_id = %self.id,
                        package = ?package_name,
                        metadata_credits = ?metadata_credits,
                        catalog_credits = package.credits,
                        "Checkout metadata credits disagree with catalog, using catalog"
                    );
                }
                if self
                    .amount_total
                    .is_some_and(|total| total != package.price_cents)
                {
                    tracing::warn!(
                        session_id = %self.id,
                        package = ?package_name,
                        amount_total = ?self.amount_total,
                        catalog_price_cents = package.price_cents,
                        "Checkout amount_total disagrees with catalog price"
                    );
                }
                package.credits
            }
            None => metadata_credits.ok_or_else(|| {
                ApiError::MalformedEvent(format!(
                    "session {} names no known package and has no credits metadata",
                    self.id
                ))
            })?,
        };

        if credits <= 0 {
            return Err(ApiError::MalformedEvent(format!(
                "session {} resolves to a non-positive credit amount ({})",
                self.id, credits
            )));
        }

        let metadata = serde_json::to_value(&self.metadata).ok();

        Ok(SettlementEvent {
            user_id,
            external_reference: self.id,
            credits,
            package_name,
            price_cents: self.amount_total,
            currency: self.currency,
            payment_intent: self.payment_intent,
            metadata,
        })
    }
}

/// Webhook acknowledgement body. Stripe only cares about the status code;
/// the fields exist for log correlation and manual replay triage.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAck {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub already_processed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received: Option<bool>,
}

impl WebhookAck {
    /// Settlement applied.
    pub fn ok() -> Self {
        Self {
            success: Some(true),
            already_processed: None,
            received: None,
        }
    }

    /// Duplicate delivery of an already-settled event. Still a success:
    /// anything but a 2xx makes the provider retry forever.
    pub fn duplicate() -> Self {
        Self {
            success: Some(true),
            already_processed: Some(true),
            received: None,
        }
    }

    /// Event type we do not handle, acknowledged and dropped.
    pub fn ignored() -> Self {
        Self {
            success: None,
            already_processed: None,
            received: Some(true),
        }
    }
}
