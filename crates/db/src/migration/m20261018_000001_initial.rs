//! Initial database migration.
//!
//! Creates account users, accounts, transactions and the account lock lease table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ============================================================
        // PART 1: ACCOUNT USERS
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(AccountUsers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AccountUsers::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AccountUsers::Name).string().not_null())
                    .col(timestamp_col(AccountUsers::CreatedAt))
                    .col(timestamp_col(AccountUsers::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // PART 2: ACCOUNTS
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Accounts::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Accounts::AccountUserId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Accounts::AccountNumber)
                            .string_len(10)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Accounts::AccountStatus).string_len(16).not_null())
                    .col(
                        ColumnDef::new(Accounts::Balance)
                            .big_integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(Accounts::Balance).gte(0)),
                    )
                    .col(timestamp_col(Accounts::RegisteredAt))
                    .col(ColumnDef::new(Accounts::UnregisteredAt).timestamp_with_time_zone().null())
                    .col(timestamp_col(Accounts::CreatedAt))
                    .col(timestamp_col(Accounts::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_accounts_account_user")
                            .from(Accounts::Table, Accounts::AccountUserId)
                            .to(AccountUsers::Table, AccountUsers::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_accounts_account_user")
                    .table(Accounts::Table)
                    .col(Accounts::AccountUserId)
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // PART 3: TRANSACTIONS
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Transactions::TransactionId)
                            .string_len(32)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Transactions::TransactionType).string_len(16).not_null())
                    .col(
                        ColumnDef::new(Transactions::TransactionResultType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::AccountId).big_integer().not_null())
                    .col(ColumnDef::new(Transactions::Amount).big_integer().not_null())
                    .col(ColumnDef::new(Transactions::BalanceSnapshot).big_integer().not_null())
                    .col(timestamp_col(Transactions::TransactedAt))
                    .col(ColumnDef::new(Transactions::OriginalTransactionId).string_len(32).null())
                    .col(timestamp_col(Transactions::CreatedAt))
                    .col(timestamp_col(Transactions::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transactions_account")
                            .from(Transactions::Table, Transactions::AccountId)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_transactions_account")
                    .table(Transactions::Table)
                    .col(Transactions::AccountId)
                    .col(Transactions::TransactedAt)
                    .to_owned(),
            )
            .await?;

        // A use can be reversed at most once.
        manager
            .create_index(
                Index::create()
                    .name("idx_transactions_original")
                    .table(Transactions::Table)
                    .col(Transactions::OriginalTransactionId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // PART 4: ACCOUNT LOCK LEASES
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(AccountLocks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AccountLocks::LockKey)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AccountLocks::Holder).string_len(32).not_null())
                    .col(
                        ColumnDef::new(AccountLocks::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AccountLocks::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transactions::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AccountUsers::Table).if_exists().to_owned())
            .await
    }
}

fn timestamp_col(column: impl IntoIden) -> ColumnDef {
    ColumnDef::new(column)
        .timestamp_with_time_zone()
        .not_null()
        .to_owned()
}

#[derive(DeriveIden)]
enum AccountUsers {
    Table,
    Id,
    Name,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Accounts {
    Table,
    Id,
    AccountUserId,
    AccountNumber,
    AccountStatus,
    Balance,
    RegisteredAt,
    UnregisteredAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Transactions {
    Table,
    Id,
    TransactionId,
    TransactionType,
    TransactionResultType,
    AccountId,
    Amount,
    BalanceSnapshot,
    TransactedAt,
    OriginalTransactionId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum AccountLocks {
    Table,
    LockKey,
    Holder,
    ExpiresAt,
}
