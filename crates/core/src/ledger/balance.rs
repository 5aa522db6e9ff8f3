//! Balance operation rules.
//!
//! Validation and in-memory mutation for use and cancel. Persistence and
//! locking live elsewhere; everything here is pure so it can run inside any
//! atomic unit the store provides.

use chrono::{DateTime, Months, Utc};
use tally_shared::ErrorCode;

use super::account::Account;
use super::transaction::TransactionRecord;
use super::types::AccountStatus;

/// How far back a transaction may be cancelled.
pub const CANCEL_WINDOW_MONTHS: u32 = 12;

/// Balance operation rules.
pub struct BalanceService;

impl BalanceService {
    /// Validates a use request against the resolved user and account.
    ///
    /// # Errors
    ///
    /// - `UserAccountUnmatch` if `user_id` does not own the account
    /// - `AccountAlreadyUnregistered` if the account is closed
    /// - `AmountExceedBalance` if `amount` is larger than the balance
    pub fn validate_use(user_id: i64, account: &Account, amount: i64) -> Result<(), ErrorCode> {
        if account.user_id != user_id {
            return Err(ErrorCode::UserAccountUnmatch);
        }
        match account.status {
            AccountStatus::InUse => {}
            AccountStatus::Unregistered => return Err(ErrorCode::AccountAlreadyUnregistered),
        }
        if account.balance < amount {
            return Err(ErrorCode::AmountExceedBalance);
        }
        Ok(())
    }

    /// Validates and applies a use to `account`.
    ///
    /// # Errors
    ///
    /// See [`Self::validate_use`]; the account is untouched on error.
    pub fn apply_use(user_id: i64, account: &mut Account, amount: i64) -> Result<(), ErrorCode> {
        Self::validate_use(user_id, account, amount)?;
        account.use_balance(amount)
    }

    /// Validates a cancel request against the original transaction.
    ///
    /// # Errors
    ///
    /// - `TransactionNotCancellable` if the original is not a successful use
    /// - `TransactionAccountUnmatch` if the original belongs to another account
    /// - `CancelMustFully` if `amount` differs from the original amount
    /// - `TooOldOrderToCancel` if the original is older than the cancel window
    /// - `AccountAlreadyUnregistered` if the account is closed
    pub fn validate_cancel(
        original: &TransactionRecord,
        account: &Account,
        amount: i64,
        now: DateTime<Utc>,
    ) -> Result<(), ErrorCode> {
        if !original.is_successful_use() {
            return Err(ErrorCode::TransactionNotCancellable);
        }
        if original.account_id != account.id {
            return Err(ErrorCode::TransactionAccountUnmatch);
        }
        if original.amount != amount {
            return Err(ErrorCode::CancelMustFully);
        }
        if let Some(cutoff) = now.checked_sub_months(Months::new(CANCEL_WINDOW_MONTHS)) {
            if original.transacted_at < cutoff {
                return Err(ErrorCode::TooOldOrderToCancel);
            }
        }
        // Crediting a closed account would leave it with a nonzero balance.
        match account.status {
            AccountStatus::InUse => Ok(()),
            AccountStatus::Unregistered => Err(ErrorCode::AccountAlreadyUnregistered),
        }
    }

    /// Validates and applies a cancel to `account`.
    ///
    /// # Errors
    ///
    /// See [`Self::validate_cancel`]; the account is untouched on error.
    pub fn apply_cancel(
        original: &TransactionRecord,
        account: &mut Account,
        amount: i64,
        now: DateTime<Utc>,
    ) -> Result<(), ErrorCode> {
        Self::validate_cancel(original, account, amount, now)?;
        account.cancel_balance(amount)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use rstest::rstest;

    use super::*;
    use crate::ledger::types::{TransactionResultType, TransactionType};

    fn account(user_id: i64, balance: i64) -> Account {
        Account {
            id: 1,
            user_id,
            account_number: "1000000012".to_string(),
            status: AccountStatus::InUse,
            balance,
            registered_at: Utc::now(),
            unregistered_at: None,
        }
    }

    fn original(account_id: i64, amount: i64, transacted_at: DateTime<Utc>) -> TransactionRecord {
        TransactionRecord {
            transaction_id: "transactionId".to_string(),
            transaction_type: TransactionType::Use,
            result: TransactionResultType::Success,
            account_id,
            amount,
            balance_snapshot: 9_000,
            transacted_at,
            original_transaction_id: None,
        }
    }

    #[test]
    fn test_use_success() {
        let mut acc = account(12, 200_000);
        BalanceService::apply_use(12, &mut acc, 10_000).unwrap();
        assert_eq!(acc.balance, 190_000);
    }

    #[test]
    fn test_use_user_unmatch() {
        let mut acc = account(13, 200_000);
        assert_eq!(
            BalanceService::apply_use(12, &mut acc, 1_000),
            Err(ErrorCode::UserAccountUnmatch)
        );
    }

    #[test]
    fn test_use_already_unregistered() {
        let mut acc = account(12, 200_000);
        acc.status = AccountStatus::Unregistered;
        assert_eq!(
            BalanceService::apply_use(12, &mut acc, 1_000),
            Err(ErrorCode::AccountAlreadyUnregistered)
        );
    }

    #[test]
    fn test_use_exceeds_balance() {
        let mut acc = account(12, 100);
        assert_eq!(
            BalanceService::apply_use(12, &mut acc, 1_000),
            Err(ErrorCode::AmountExceedBalance)
        );
        assert_eq!(acc.balance, 100);
    }

    #[test]
    fn test_cancel_success() {
        let now = Utc::now();
        let mut acc = account(12, 10_000);
        let tx = original(1, 15_000, now - Duration::days(30));
        BalanceService::apply_cancel(&tx, &mut acc, 15_000, now).unwrap();
        assert_eq!(acc.balance, 25_000);
    }

    #[test]
    fn test_cancel_transaction_account_unmatch() {
        let now = Utc::now();
        let mut acc = account(12, 10_000);
        let tx = original(2, 15_000, now);
        assert_eq!(
            BalanceService::apply_cancel(&tx, &mut acc, 15_000, now),
            Err(ErrorCode::TransactionAccountUnmatch)
        );
    }

    #[test]
    fn test_cancel_must_be_full() {
        let now = Utc::now();
        let mut acc = account(12, 10_000);
        let tx = original(1, 15_000, now);
        assert_eq!(
            BalanceService::apply_cancel(&tx, &mut acc, 20_000, now),
            Err(ErrorCode::CancelMustFully)
        );
        assert_eq!(acc.balance, 10_000);
    }

    #[test]
    fn test_cancel_too_old() {
        let now = Utc::now();
        let mut acc = account(12, 10_000);
        let tx = original(1, 15_000, now - Duration::days(366));
        assert_eq!(
            BalanceService::apply_cancel(&tx, &mut acc, 15_000, now),
            Err(ErrorCode::TooOldOrderToCancel)
        );
        assert_eq!(acc.balance, 10_000);
    }

    #[rstest]
    #[case(TransactionType::Use, TransactionResultType::Fail)]
    #[case(TransactionType::Cancel, TransactionResultType::Success)]
    #[case(TransactionType::Cancel, TransactionResultType::Fail)]
    fn test_cancel_only_successful_use(
        #[case] transaction_type: TransactionType,
        #[case] result: TransactionResultType,
    ) {
        let now = Utc::now();
        let mut acc = account(12, 100);
        let tx = TransactionRecord {
            transaction_type,
            result,
            ..original(1, 1_000, now)
        };
        assert_eq!(
            BalanceService::apply_cancel(&tx, &mut acc, 1_000, now),
            Err(ErrorCode::TransactionNotCancellable)
        );
        assert_eq!(acc.balance, 100);
    }

    #[test]
    fn test_cancel_on_unregistered_account() {
        let now = Utc::now();
        let mut acc = account(12, 0);
        acc.status = AccountStatus::Unregistered;
        let tx = original(1, 15_000, now);
        assert_eq!(
            BalanceService::apply_cancel(&tx, &mut acc, 15_000, now),
            Err(ErrorCode::AccountAlreadyUnregistered)
        );
    }
}
