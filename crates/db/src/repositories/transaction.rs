//! Transaction repository for balance operations.
//!
//! Each use or cancel reads the account, runs the balance rules from
//! `tally_core`, and writes the new balance together with a transaction row in
//! one database transaction. Failed attempts are recorded separately without
//! touching the balance.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbErr, EntityTrait, QueryFilter, Set, SqlErr, TransactionTrait, sea_query::Expr,
};
use tally_core::ledger::{
    Account, BalanceService, TransactionRecord, TransactionResultType, TransactionSummary,
    TransactionType, new_transaction_id,
};
use tally_shared::{AppError, ErrorCode};
use tracing::{info, warn};

use super::account::find_account;
use crate::entities::{account_users, accounts, sea_orm_active_enums, transactions};

/// Error types for transaction operations.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// A business rule rejected the operation.
    #[error(transparent)]
    Business(#[from] ErrorCode),

    /// The stored balance changed between read and write.
    #[error("Concurrent modification detected for account {0}")]
    ConcurrentModification(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl TransactionError {
    /// Returns the business code if a rule rejected the operation.
    #[must_use]
    pub const fn business_code(&self) -> Option<ErrorCode> {
        match self {
            Self::Business(code) => Some(*code),
            Self::ConcurrentModification(_) | Self::Database(_) => None,
        }
    }
}

impl From<TransactionError> for AppError {
    fn from(err: TransactionError) -> Self {
        match err {
            TransactionError::Business(code) => Self::Business(code),
            TransactionError::ConcurrentModification(account_number) => Self::Internal(format!(
                "Concurrent modification detected for account {account_number}"
            )),
            TransactionError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

/// Transaction repository for balance operations.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    db: DatabaseConnection,
}

impl TransactionRepository {
    /// Creates a new transaction repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Debits `amount` from `account_number` on behalf of `user_id`.
    ///
    /// The caller is expected to hold the account lock.
    ///
    /// # Errors
    ///
    /// - `UserNotFound` / `AccountNotFound` if either does not exist
    /// - `UserAccountUnmatch` if the user does not own the account
    /// - `AccountAlreadyUnregistered` if the account is closed
    /// - `AmountExceedBalance` if the balance is too small
    /// - `ConcurrentModification` if the balance changed underneath
    pub async fn use_balance(
        &self,
        user_id: i64,
        account_number: &str,
        amount: i64,
    ) -> Result<TransactionSummary, TransactionError> {
        let txn = self.db.begin().await?;

        account_users::Entity::find_by_id(user_id)
            .one(&txn)
            .await?
            .ok_or(ErrorCode::UserNotFound)?;

        let stored = find_account(&txn, account_number)
            .await?
            .ok_or(ErrorCode::AccountNotFound)?;

        let now = Utc::now();
        let mut account = Account::from(stored.clone());
        BalanceService::apply_use(user_id, &mut account, amount)?;

        save_balance(&txn, &stored, account.balance, now).await?;
        let record = insert_record(
            &txn,
            TransactionType::Use,
            TransactionResultType::Success,
            &account,
            amount,
            now,
            None,
        )
        .await?;

        txn.commit().await?;

        info!(
            account_number = %account.account_number,
            transaction_id = %record.transaction_id,
            amount = amount,
            "Balance used"
        );
        Ok(TransactionSummary::from_record(account.account_number, record))
    }

    /// Reverses the use `transaction_id` on `account_number` in full.
    ///
    /// The caller is expected to hold the account lock.
    ///
    /// # Errors
    ///
    /// - `TransactionNotFound` / `AccountNotFound` if either does not exist
    /// - `TransactionNotCancellable` if the original is not a successful use
    /// - `TransactionAccountUnmatch` if the original belongs to another account
    /// - `CancelMustFully` if `amount` is not the original amount
    /// - `TooOldOrderToCancel` if the original is more than a year old
    /// - `AccountAlreadyUnregistered` if the account is closed
    /// - `TransactionAlreadyCancelled` if the use was already reversed
    /// - `ConcurrentModification` if the balance changed underneath
    pub async fn cancel_balance(
        &self,
        transaction_id: &str,
        account_number: &str,
        amount: i64,
    ) -> Result<TransactionSummary, TransactionError> {
        let txn = self.db.begin().await?;

        let original: TransactionRecord = find_transaction(&txn, transaction_id)
            .await?
            .ok_or(ErrorCode::TransactionNotFound)?
            .into();

        let stored = find_account(&txn, account_number)
            .await?
            .ok_or(ErrorCode::AccountNotFound)?;

        let now = Utc::now();
        let mut account = Account::from(stored.clone());
        BalanceService::apply_cancel(&original, &mut account, amount, now)?;

        if find_reversal(&txn, &original.transaction_id).await?.is_some() {
            return Err(ErrorCode::TransactionAlreadyCancelled.into());
        }

        save_balance(&txn, &stored, account.balance, now).await?;
        let record = insert_record(
            &txn,
            TransactionType::Cancel,
            TransactionResultType::Success,
            &account,
            amount,
            now,
            Some(&original.transaction_id),
        )
        .await
        .map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                TransactionError::Business(ErrorCode::TransactionAlreadyCancelled)
            }
            _ => TransactionError::Database(e),
        })?;

        txn.commit().await?;

        info!(
            account_number = %account.account_number,
            transaction_id = %record.transaction_id,
            original_transaction_id = %original.transaction_id,
            amount = amount,
            "Balance cancelled"
        );
        Ok(TransactionSummary::from_record(account.account_number, record))
    }

    /// Records a rejected use of `amount` on `account_number`.
    ///
    /// # Errors
    ///
    /// `AccountNotFound` if the account does not exist.
    pub async fn save_failed_use(
        &self,
        account_number: &str,
        amount: i64,
    ) -> Result<TransactionSummary, TransactionError> {
        self.save_failed(TransactionType::Use, account_number, amount)
            .await
    }

    /// Records a rejected cancel of `amount` on `account_number`.
    ///
    /// # Errors
    ///
    /// `AccountNotFound` if the account does not exist.
    pub async fn save_failed_cancel(
        &self,
        account_number: &str,
        amount: i64,
    ) -> Result<TransactionSummary, TransactionError> {
        self.save_failed(TransactionType::Cancel, account_number, amount)
            .await
    }

    async fn save_failed(
        &self,
        transaction_type: TransactionType,
        account_number: &str,
        amount: i64,
    ) -> Result<TransactionSummary, TransactionError> {
        let txn = self.db.begin().await?;

        let account = Account::from(
            find_account(&txn, account_number)
                .await?
                .ok_or(ErrorCode::AccountNotFound)?,
        );

        let record = insert_record(
            &txn,
            transaction_type,
            TransactionResultType::Fail,
            &account,
            amount,
            Utc::now(),
            None,
        )
        .await?;

        txn.commit().await?;

        warn!(
            account_number = %account.account_number,
            transaction_id = %record.transaction_id,
            transaction_type = ?transaction_type,
            amount = amount,
            "Failed transaction recorded"
        );
        Ok(TransactionSummary::from_record(account.account_number, record))
    }

    /// Looks up a transaction by its external id.
    ///
    /// # Errors
    ///
    /// `TransactionNotFound` if no transaction has that id.
    pub async fn query_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<TransactionSummary, TransactionError> {
        let (transaction, account) = transactions::Entity::find()
            .filter(transactions::Column::TransactionId.eq(transaction_id))
            .find_also_related(accounts::Entity)
            .one(&self.db)
            .await?
            .ok_or(ErrorCode::TransactionNotFound)?;

        let account = account.ok_or(ErrorCode::AccountNotFound)?;
        Ok(TransactionSummary::from_record(
            account.account_number,
            transaction.into(),
        ))
    }
}

async fn find_transaction<C: ConnectionTrait>(
    conn: &C,
    transaction_id: &str,
) -> Result<Option<transactions::Model>, DbErr> {
    transactions::Entity::find()
        .filter(transactions::Column::TransactionId.eq(transaction_id))
        .one(conn)
        .await
}

async fn find_reversal<C: ConnectionTrait>(
    conn: &C,
    transaction_id: &str,
) -> Result<Option<transactions::Model>, DbErr> {
    transactions::Entity::find()
        .filter(transactions::Column::OriginalTransactionId.eq(transaction_id))
        .one(conn)
        .await
}

/// Writes `balance` only if the row is still open and holds the balance it
/// was read with.
async fn save_balance(
    txn: &DatabaseTransaction,
    stored: &accounts::Model,
    balance: i64,
    now: DateTime<Utc>,
) -> Result<(), TransactionError> {
    let result = accounts::Entity::update_many()
        .col_expr(accounts::Column::Balance, Expr::value(balance))
        .col_expr(accounts::Column::UpdatedAt, Expr::value(now))
        .filter(accounts::Column::Id.eq(stored.id))
        .filter(accounts::Column::Balance.eq(stored.balance))
        .filter(
            accounts::Column::AccountStatus.eq(sea_orm_active_enums::AccountStatus::InUse),
        )
        .exec(txn)
        .await?;

    if result.rows_affected == 0 {
        return Err(TransactionError::ConcurrentModification(
            stored.account_number.clone(),
        ));
    }
    Ok(())
}

async fn insert_record<C: ConnectionTrait>(
    conn: &C,
    transaction_type: TransactionType,
    result: TransactionResultType,
    account: &Account,
    amount: i64,
    now: DateTime<Utc>,
    original_transaction_id: Option<&str>,
) -> Result<TransactionRecord, DbErr> {
    let model = transactions::ActiveModel {
        transaction_id: Set(new_transaction_id()),
        transaction_type: Set(transaction_type.into()),
        transaction_result_type: Set(result.into()),
        account_id: Set(account.id),
        amount: Set(amount),
        balance_snapshot: Set(account.balance),
        transacted_at: Set(now),
        original_transaction_id: Set(original_transaction_id.map(str::to_owned)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    Ok(model.into())
}
