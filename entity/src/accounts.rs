use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::sea_orm_active_enums::AccountTier;

/// One row per user. `credits` is the cached balance; it is only ever
/// written in the same database transaction as a `credit_transactions`
/// insert, so folding the ledger always reproduces it.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    /// User id, issued by the main web app at sign-up.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tier: AccountTier,
    pub credits: i32,
    /// Set once the user has completed onboarding; gates timed activities.
    pub onboarded_at: Option<TimeDateTimeWithTimeZone>,
    pub created_at: TimeDateTimeWithTimeZone,
    pub updated_at: TimeDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::credit_transactions::Entity")]
    CreditTransactions,
}

impl Related<super::credit_transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CreditTransactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
