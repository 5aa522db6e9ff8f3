//! Transaction records and their read projection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::{TransactionResultType, TransactionType};

/// An immutable ledger record of one balance-affecting attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Opaque external handle.
    pub transaction_id: String,
    /// Use or cancel.
    pub transaction_type: TransactionType,
    /// Success or fail.
    pub result: TransactionResultType,
    /// Storage id of the account the record belongs to.
    pub account_id: i64,
    /// Requested amount.
    pub amount: i64,
    /// Account balance when the record was written.
    pub balance_snapshot: i64,
    /// When the attempt happened.
    pub transacted_at: DateTime<Utc>,
    /// For a successful cancel, the use it reverses.
    pub original_transaction_id: Option<String>,
}

impl TransactionRecord {
    /// Whether this record is a use that took money from the account.
    #[must_use]
    pub fn is_successful_use(&self) -> bool {
        self.transaction_type == TransactionType::Use
            && self.result == TransactionResultType::Success
    }
}

/// Read-optimized view of a transaction, keyed by account number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSummary {
    /// Account number the transaction belongs to.
    pub account_number: String,
    /// Use or cancel.
    pub transaction_type: TransactionType,
    /// Success or fail.
    pub result: TransactionResultType,
    /// Opaque external handle.
    pub transaction_id: String,
    /// Requested amount.
    pub amount: i64,
    /// Account balance when the record was written.
    pub balance_snapshot: i64,
    /// When the attempt happened.
    pub transacted_at: DateTime<Utc>,
}

impl TransactionSummary {
    /// Projects a stored record for the given account number.
    #[must_use]
    pub fn from_record(account_number: impl Into<String>, record: TransactionRecord) -> Self {
        Self {
            account_number: account_number.into(),
            transaction_type: record.transaction_type,
            result: record.result,
            transaction_id: record.transaction_id,
            amount: record.amount,
            balance_snapshot: record.balance_snapshot,
            transacted_at: record.transacted_at,
        }
    }
}

/// Generates a fresh transaction id: 32 lowercase hex characters, no separators.
#[must_use]
pub fn new_transaction_id() -> String {
    Uuid::new_v4().simple().to_string()
}
