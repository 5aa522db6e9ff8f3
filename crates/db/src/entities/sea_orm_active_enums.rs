//! `SeaORM` active enums stored as short strings.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use tally_core::ledger;

/// Account lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum AccountStatus {
    /// Open for balance operations.
    #[sea_orm(string_value = "IN_USE")]
    InUse,
    /// Closed.
    #[sea_orm(string_value = "UNREGISTERED")]
    Unregistered,
}

/// Transaction kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum TransactionType {
    /// Debit.
    #[sea_orm(string_value = "USE")]
    Use,
    /// Reversal of a use.
    #[sea_orm(string_value = "CANCEL")]
    Cancel,
}

/// Transaction outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum TransactionResultType {
    /// Applied.
    #[sea_orm(string_value = "SUCCESS")]
    Success,
    /// Rejected and recorded for audit.
    #[sea_orm(string_value = "FAIL")]
    Fail,
}

impl From<AccountStatus> for ledger::AccountStatus {
    fn from(value: AccountStatus) -> Self {
        match value {
            AccountStatus::InUse => Self::InUse,
            AccountStatus::Unregistered => Self::Unregistered,
        }
    }
}

impl From<ledger::AccountStatus> for AccountStatus {
    fn from(value: ledger::AccountStatus) -> Self {
        match value {
            ledger::AccountStatus::InUse => Self::InUse,
            ledger::AccountStatus::Unregistered => Self::Unregistered,
        }
    }
}

impl From<TransactionType> for ledger::TransactionType {
    fn from(value: TransactionType) -> Self {
        match value {
            TransactionType::Use => Self::Use,
            TransactionType::Cancel => Self::Cancel,
        }
    }
}

impl From<ledger::TransactionType> for TransactionType {
    fn from(value: ledger::TransactionType) -> Self {
        match value {
            ledger::TransactionType::Use => Self::Use,
            ledger::TransactionType::Cancel => Self::Cancel,
        }
    }
}

impl From<TransactionResultType> for ledger::TransactionResultType {
    fn from(value: TransactionResultType) -> Self {
        match value {
            TransactionResultType::Success => Self::Success,
            TransactionResultType::Fail => Self::Fail,
        }
    }
}

impl From<ledger::TransactionResultType> for TransactionResultType {
    fn from(value: ledger::TransactionResultType) -> Self {
        match value {
            ledger::TransactionResultType::Success => Self::Success,
            ledger::TransactionResultType::Fail => Self::Fail,
        }
    }
}
