use entity::sea_orm_active_enums::{TransactionKind, TransactionStatus};
use serde::Serialize;

/// Balance read exposed to the web app's page gates
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditsResponse {
    pub credits: i32,
    pub minutes: i32,
}

/// Single ledger entry as exposed over the API
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub id: uuid::Uuid,
    pub kind: TransactionKind,
    pub amount: i32,
    pub credits_after: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_cents: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    pub status: TransactionStatus,
    pub created_at: time::OffsetDateTime,
}

impl From<entity::credit_transactions::Model> for TransactionRecord {
    fn from(model: entity::credit_transactions::Model) -> Self {
        Self {
            id: model.id,
            kind: model.kind,
            amount: model.amount,
            credits_after: model.credits_after,
            external_reference: model.external_reference,
            package_name: model.package_name,
            price_cents: model.price_cents,
            currency: model.currency,
            status: model.status,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsResponse {
    pub transactions: Vec<TransactionRecord>,
}
