//! Account ledger logic.
//!
//! This module implements the balance rules:
//! - Account aggregate and account-number assignment
//! - Transaction records and the read projection
//! - Use/cancel validation and mutation
//! - Domain enums and limits

pub mod account;
pub mod balance;
pub mod transaction;
pub mod types;

#[cfg(test)]
mod balance_props;

pub use account::{Account, next_account_number};
pub use balance::BalanceService;
pub use transaction::{TransactionRecord, TransactionSummary, new_transaction_id};
pub use types::{
    ACCOUNT_NUMBER_LENGTH, AccountStatus, MAX_ACCOUNTS_PER_USER, MAX_TRANSACTION_AMOUNT,
    MIN_TRANSACTION_AMOUNT, TransactionResultType, TransactionType,
};
