//! Ledger domain types and limits.

use serde::{Deserialize, Serialize};

/// Smallest amount a single use or cancel may move.
pub const MIN_TRANSACTION_AMOUNT: i64 = 10;

/// Largest amount a single use or cancel may move.
pub const MAX_TRANSACTION_AMOUNT: i64 = 1_000_000_000;

/// Number of digits in an account number.
pub const ACCOUNT_NUMBER_LENGTH: usize = 10;

/// Account number handed out when no account exists yet.
pub const FIRST_ACCOUNT_NUMBER: u64 = 1_000_000_000;

/// Maximum number of accounts a single user may own.
pub const MAX_ACCOUNTS_PER_USER: u64 = 10;

/// Account lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    /// Open and usable.
    InUse,
    /// Closed; terminal.
    Unregistered,
}

/// Kind of balance-affecting operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Money taken out of the account.
    Use,
    /// A previous use credited back.
    Cancel,
}

/// Outcome of a balance-affecting attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionResultType {
    /// Balance changed and the record reflects the new balance.
    Success,
    /// Rejected; the record carries the untouched balance.
    Fail,
}
