pub mod accounts;
pub mod credit_transactions;
pub mod sea_orm_active_enums;
