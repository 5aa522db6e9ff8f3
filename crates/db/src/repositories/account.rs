//! Account repository for account lifecycle database operations.
//!
//! Opening assigns the next free account number, closing enforces ownership
//! and an empty balance. Balance changes live in the transaction repository.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait, sea_query::Expr,
};
use tally_core::ledger::{Account, MAX_ACCOUNTS_PER_USER, next_account_number};
use tally_shared::{AppError, ErrorCode};
use tracing::info;

use crate::entities::{account_users, accounts, sea_orm_active_enums::AccountStatus};

/// Error types for account operations.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    /// A business rule rejected the operation.
    #[error(transparent)]
    Business(#[from] ErrorCode),

    /// The account changed between read and write.
    #[error("Concurrent modification detected for account {0}")]
    ConcurrentModification(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Business(code) => Self::Business(code),
            AccountError::ConcurrentModification(account_number) => Self::Internal(format!(
                "Concurrent modification detected for account {account_number}"
            )),
            AccountError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

/// Account repository for lifecycle operations.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Opens a new account for `user_id` with `initial_balance`.
    ///
    /// # Errors
    ///
    /// - `UserNotFound` if the user does not exist
    /// - `MaxAccountPerUser10` if the user already owns the maximum
    /// - `InvalidRequest` for a negative initial balance
    pub async fn create_account(
        &self,
        user_id: i64,
        initial_balance: i64,
    ) -> Result<Account, AccountError> {
        if initial_balance < 0 {
            return Err(ErrorCode::InvalidRequest.into());
        }

        let txn = self.db.begin().await?;

        ensure_user(&txn, user_id).await?;

        let owned = accounts::Entity::find()
            .filter(accounts::Column::AccountUserId.eq(user_id))
            .count(&txn)
            .await?;
        if owned >= MAX_ACCOUNTS_PER_USER {
            return Err(ErrorCode::MaxAccountPerUser10.into());
        }

        let highest = accounts::Entity::find()
            .order_by_desc(accounts::Column::AccountNumber)
            .one(&txn)
            .await?;
        let account_number =
            next_account_number(highest.as_ref().map(|a| a.account_number.as_str()))?;

        let now = Utc::now();
        let account = accounts::ActiveModel {
            account_user_id: Set(user_id),
            account_number: Set(account_number),
            account_status: Set(AccountStatus::InUse),
            balance: Set(initial_balance),
            registered_at: Set(now),
            unregistered_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        info!(
            user_id = user_id,
            account_number = %account.account_number,
            "Account created"
        );
        Ok(account.into())
    }

    /// Closes the account `account_number` on behalf of `user_id`.
    ///
    /// # Errors
    ///
    /// - `UserNotFound` / `AccountNotFound` if either does not exist
    /// - `UserAccountUnmatch` if the user does not own the account
    /// - `AccountAlreadyUnregistered` if it is already closed
    /// - `BalanceNotEmpty` if money remains in it
    /// - `ConcurrentModification` if the account was credited or closed underneath
    pub async fn close_account(
        &self,
        user_id: i64,
        account_number: &str,
    ) -> Result<Account, AccountError> {
        let txn = self.db.begin().await?;

        ensure_user(&txn, user_id).await?;

        let stored = find_account(&txn, account_number)
            .await?
            .ok_or(ErrorCode::AccountNotFound)?;

        let now = Utc::now();
        let mut account = Account::from(stored.clone());
        account.unregister(user_id, now)?;

        // Only an open, empty account may be closed.
        let result = accounts::Entity::update_many()
            .col_expr(
                accounts::Column::AccountStatus,
                Expr::value(AccountStatus::from(account.status)),
            )
            .col_expr(accounts::Column::UnregisteredAt, Expr::value(account.unregistered_at))
            .col_expr(accounts::Column::UpdatedAt, Expr::value(now))
            .filter(accounts::Column::Id.eq(stored.id))
            .filter(accounts::Column::AccountStatus.eq(AccountStatus::InUse))
            .filter(accounts::Column::Balance.eq(0))
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            return Err(AccountError::ConcurrentModification(stored.account_number));
        }

        txn.commit().await?;

        info!(
            user_id = user_id,
            account_number = %account.account_number,
            "Account unregistered"
        );
        Ok(account)
    }

    /// Lists the accounts owned by `user_id` in account-number order.
    ///
    /// # Errors
    ///
    /// `UserNotFound` if the user does not exist.
    pub async fn list_accounts(&self, user_id: i64) -> Result<Vec<Account>, AccountError> {
        ensure_user(&self.db, user_id).await?;

        let accounts = accounts::Entity::find()
            .filter(accounts::Column::AccountUserId.eq(user_id))
            .order_by_asc(accounts::Column::AccountNumber)
            .all(&self.db)
            .await?;

        Ok(accounts.into_iter().map(Account::from).collect())
    }

    /// Finds an account by its account number.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_account_number(
        &self,
        account_number: &str,
    ) -> Result<Option<Account>, DbErr> {
        Ok(find_account(&self.db, account_number)
            .await?
            .map(Account::from))
    }
}

/// Fails with `UserNotFound` unless the account user exists.
async fn ensure_user<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
) -> Result<account_users::Model, AccountError> {
    account_users::Entity::find_by_id(user_id)
        .one(conn)
        .await?
        .ok_or_else(|| ErrorCode::UserNotFound.into())
}

pub(crate) async fn find_account<C: ConnectionTrait>(
    conn: &C,
    account_number: &str,
) -> Result<Option<accounts::Model>, DbErr> {
    accounts::Entity::find()
        .filter(accounts::Column::AccountNumber.eq(account_number))
        .one(conn)
        .await
}
