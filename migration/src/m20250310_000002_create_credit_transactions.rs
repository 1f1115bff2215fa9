use sea_orm_migration::prelude::extension::postgres::Type;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(TransactionKind::Enum)
                    .values([
                        TransactionKind::Purchase,
                        TransactionKind::Consumption,
                        TransactionKind::Refund,
                        TransactionKind::Adjustment,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(TransactionStatus::Enum)
                    .values([
                        TransactionStatus::Pending,
                        TransactionStatus::Completed,
                        TransactionStatus::Failed,
                    ])
                    .to_owned(),
            )
            .await?;

        // Append-only transaction ledger
        manager
            .create_table(
                Table::create()
                    .table(CreditTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CreditTransactions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CreditTransactions::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(CreditTransactions::Kind)
                            .enumeration(
                                TransactionKind::Enum,
                                [
                                    TransactionKind::Purchase,
                                    TransactionKind::Consumption,
                                    TransactionKind::Refund,
                                    TransactionKind::Adjustment,
                                ],
                            )
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CreditTransactions::Amount)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CreditTransactions::CreditsAfter)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CreditTransactions::ExternalReference)
                            .string()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(CreditTransactions::PaymentIntent)
                            .string()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(CreditTransactions::PackageName)
                            .string()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(CreditTransactions::PriceCents)
                            .big_integer()
                            .null(),
                    )
                    .col(ColumnDef::new(CreditTransactions::Currency).string().null())
                    .col(
                        ColumnDef::new(CreditTransactions::Status)
                            .enumeration(
                                TransactionStatus::Enum,
                                [
                                    TransactionStatus::Pending,
                                    TransactionStatus::Completed,
                                    TransactionStatus::Failed,
                                ],
                            )
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CreditTransactions::Metadata)
                            .json_binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(CreditTransactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_credit_transactions_user")
                            .from(CreditTransactions::Table, CreditTransactions::UserId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // Idempotency key: at most one ledger entry per payment-provider
        // reference. Postgres unique indexes ignore NULLs, so internal
        // entries (consumption, adjustments) are exempt.
        manager
            .create_index(
                Index::create()
                    .name("idx_credit_transactions_external_reference")
                    .table(CreditTransactions::Table)
                    .col(CreditTransactions::ExternalReference)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Audit reads fold the per-user ledger in created_at order
        manager
            .create_index(
                Index::create()
                    .name("idx_credit_transactions_user_created")
                    .table(CreditTransactions::Table)
                    .col(CreditTransactions::UserId)
                    .col(CreditTransactions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Refund attribution looks up the original purchase by payment intent
        manager
            .create_index(
                Index::create()
                    .name("idx_credit_transactions_payment_intent")
                    .table(CreditTransactions::Table)
                    .col(CreditTransactions::PaymentIntent)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CreditTransactions::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(TransactionKind::Enum).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(TransactionStatus::Enum).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CreditTransactions {
    Table,
    Id,
    UserId,
    Kind,
    Amount,
    CreditsAfter,
    ExternalReference,
    PaymentIntent,
    PackageName,
    PriceCents,
    Currency,
    Status,
    Metadata,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Accounts {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum TransactionKind {
    #[sea_orm(iden = "transaction_kind")]
    Enum,
    #[sea_orm(iden = "purchase")]
    Purchase,
    #[sea_orm(iden = "consumption")]
    Consumption,
    #[sea_orm(iden = "refund")]
    Refund,
    #[sea_orm(iden = "adjustment")]
    Adjustment,
}

#[derive(DeriveIden)]
enum TransactionStatus {
    #[sea_orm(iden = "transaction_status")]
    Enum,
    #[sea_orm(iden = "pending")]
    Pending,
    #[sea_orm(iden = "completed")]
    Completed,
    #[sea_orm(iden = "failed")]
    Failed,
}
