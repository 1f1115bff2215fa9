use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::sea_orm_active_enums::{TransactionKind, TransactionStatus};

/// Append-only audit ledger. Rows are created once and never updated or
/// deleted. `amount` is signed: purchases and positive adjustments credit
/// the balance, consumptions and refunds debit it.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "credit_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: TransactionKind,
    pub amount: i32,
    /// Balance snapshot immediately after this entry committed.
    pub credits_after: i32,
    /// Payment provider's idempotency key (checkout session id for
    /// purchases, charge id for refunds). Unique; null for internal entries.
    #[sea_orm(unique)]
    pub external_reference: Option<String>,
    /// Stripe payment intent, used to attribute refunds to the purchase.
    pub payment_intent: Option<String>,
    pub package_name: Option<String>,
    pub price_cents: Option<i64>,
    pub currency: Option<String>,
    pub status: TransactionStatus,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub metadata: Option<Json>,
    pub created_at: TimeDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::UserId",
        to = "super::accounts::Column::Id"
    )]
    Accounts,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
