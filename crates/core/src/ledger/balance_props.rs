//! Property-based tests for BalanceService.
//!
//! - Use debits exactly the requested amount or leaves the account untouched
//! - Cancel with any amount other than the original never mutates the account
//! - Cancel of a transaction older than the window never mutates the account

use chrono::{Duration, Utc};
use proptest::prelude::*;
use tally_shared::ErrorCode;

use super::account::Account;
use super::balance::BalanceService;
use super::transaction::TransactionRecord;
use super::types::{
    AccountStatus, MAX_TRANSACTION_AMOUNT, MIN_TRANSACTION_AMOUNT, TransactionResultType,
    TransactionType,
};

/// Strategy for amounts accepted by request validation.
fn valid_amount() -> impl Strategy<Value = i64> {
    MIN_TRANSACTION_AMOUNT..=MAX_TRANSACTION_AMOUNT
}

fn account(balance: i64) -> Account {
    Account {
        id: 1,
        user_id: 1,
        account_number: "1000000000".to_string(),
        status: AccountStatus::InUse,
        balance,
        registered_at: Utc::now(),
        unregistered_at: None,
    }
}

fn original(amount: i64, age_days: i64) -> TransactionRecord {
    TransactionRecord {
        transaction_id: "0123456789abcdef0123456789abcdef".to_string(),
        transaction_type: TransactionType::Use,
        result: TransactionResultType::Success,
        account_id: 1,
        amount,
        balance_snapshot: 0,
        transacted_at: Utc::now() - Duration::days(age_days),
        original_transaction_id: None,
    }
}

proptest! {
    #[test]
    fn prop_use_debits_exactly_or_rejects(balance in 0i64..=2 * MAX_TRANSACTION_AMOUNT, amount in valid_amount()) {
        let mut acc = account(balance);
        match BalanceService::apply_use(1, &mut acc, amount) {
            Ok(()) => {
                prop_assert!(amount <= balance);
                prop_assert_eq!(acc.balance, balance - amount);
            }
            Err(code) => {
                prop_assert_eq!(code, ErrorCode::AmountExceedBalance);
                prop_assert!(amount > balance);
                prop_assert_eq!(acc.balance, balance);
            }
        }
        prop_assert!(acc.balance >= 0);
    }

    #[test]
    fn prop_partial_cancel_never_mutates(balance in 0i64..=MAX_TRANSACTION_AMOUNT, original_amount in valid_amount(), amount in valid_amount()) {
        prop_assume!(original_amount != amount);
        let mut acc = account(balance);
        let tx = original(original_amount, 1);
        prop_assert_eq!(
            BalanceService::apply_cancel(&tx, &mut acc, amount, Utc::now()),
            Err(ErrorCode::CancelMustFully)
        );
        prop_assert_eq!(acc.balance, balance);
    }

    #[test]
    fn prop_old_cancel_never_mutates(balance in 0i64..=MAX_TRANSACTION_AMOUNT, amount in valid_amount(), age_days in 367i64..3_650) {
        let mut acc = account(balance);
        let tx = original(amount, age_days);
        prop_assert_eq!(
            BalanceService::apply_cancel(&tx, &mut acc, amount, Utc::now()),
            Err(ErrorCode::TooOldOrderToCancel)
        );
        prop_assert_eq!(acc.balance, balance);
    }

    #[test]
    fn prop_use_then_cancel_restores_balance(balance in 0i64..=MAX_TRANSACTION_AMOUNT, amount in valid_amount()) {
        prop_assume!(amount <= balance);
        let mut acc = account(balance);
        BalanceService::apply_use(1, &mut acc, amount).unwrap();
        let tx = original(amount, 0);
        BalanceService::apply_cancel(&tx, &mut acc, amount, Utc::now()).unwrap();
        prop_assert_eq!(acc.balance, balance);
    }
}
