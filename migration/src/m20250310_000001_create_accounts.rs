use sea_orm_migration::prelude::extension::postgres::Type;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // account_tier enum
        manager
            .create_type(
                Type::create()
                    .as_enum(AccountTier::Enum)
                    .values([AccountTier::Free, AccountTier::Premium])
                    .to_owned(),
            )
            .await?;

        // Create accounts table holding the cached credit balance
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Accounts::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Accounts::Tier)
                            .enumeration(
                                AccountTier::Enum,
                                [AccountTier::Free, AccountTier::Premium],
                            )
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Accounts::Credits)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Accounts::OnboardedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Accounts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Accounts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Balance must never go negative; enforced in the ledger code and
        // backstopped here.
        manager
            .get_connection()
            .execute_unprepared(
                "ALTER TABLE accounts ADD CONSTRAINT chk_accounts_credits_non_negative CHECK (credits >= 0)",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(AccountTier::Enum).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Accounts {
    Table,
    Id,
    Tier,
    Credits,
    OnboardedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum AccountTier {
    #[sea_orm(iden = "account_tier")]
    Enum,
    #[sea_orm(iden = "free")]
    Free,
    #[sea_orm(iden = "premium")]
    Premium,
}
