//! Account aggregate and account-number assignment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_shared::ErrorCode;

use super::types::{ACCOUNT_NUMBER_LENGTH, AccountStatus, FIRST_ACCOUNT_NUMBER};

/// A user's account as seen by the business rules.
///
/// Instances are transient copies of the stored row, owned by one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Storage id.
    pub id: i64,
    /// Owning account user id.
    pub user_id: i64,
    /// Ten-digit business identifier.
    pub account_number: String,
    /// Lifecycle status.
    pub status: AccountStatus,
    /// Current balance, never negative.
    pub balance: i64,
    /// When the account was opened.
    pub registered_at: DateTime<Utc>,
    /// When the account was closed.
    pub unregistered_at: Option<DateTime<Utc>>,
}

impl Account {
    /// Returns true while the account can take balance operations.
    #[must_use]
    pub const fn is_in_use(&self) -> bool {
        matches!(self.status, AccountStatus::InUse)
    }

    /// Debits `amount` from the balance.
    ///
    /// # Errors
    ///
    /// `AmountExceedBalance` if the balance would go negative, `InvalidRequest`
    /// for a negative amount.
    pub fn use_balance(&mut self, amount: i64) -> Result<(), ErrorCode> {
        if amount < 0 {
            return Err(ErrorCode::InvalidRequest);
        }
        if amount > self.balance {
            return Err(ErrorCode::AmountExceedBalance);
        }
        self.balance -= amount;
        Ok(())
    }

    /// Credits `amount` back to the balance.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` for a negative amount or on overflow.
    pub fn cancel_balance(&mut self, amount: i64) -> Result<(), ErrorCode> {
        if amount < 0 {
            return Err(ErrorCode::InvalidRequest);
        }
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(ErrorCode::InvalidRequest)?;
        Ok(())
    }

    /// Closes the account on behalf of `user_id`.
    ///
    /// # Errors
    ///
    /// - `UserAccountUnmatch` if `user_id` does not own the account
    /// - `AccountAlreadyUnregistered` if it is already closed
    /// - `BalanceNotEmpty` if money remains in it
    pub fn unregister(&mut self, user_id: i64, now: DateTime<Utc>) -> Result<(), ErrorCode> {
        if self.user_id != user_id {
            return Err(ErrorCode::UserAccountUnmatch);
        }
        match self.status {
            AccountStatus::Unregistered => return Err(ErrorCode::AccountAlreadyUnregistered),
            AccountStatus::InUse => {}
        }
        if self.balance != 0 {
            return Err(ErrorCode::BalanceNotEmpty);
        }

        self.status = AccountStatus::Unregistered;
        self.unregistered_at = Some(now);
        Ok(())
    }
}

/// Computes the account number following `highest`, the largest one issued so far.
///
/// # Errors
///
/// `InternalServerError` if the stored number is not numeric or the ten-digit
/// space is exhausted.
pub fn next_account_number(highest: Option<&str>) -> Result<String, ErrorCode> {
    let next = match highest {
        None => FIRST_ACCOUNT_NUMBER,
        Some(number) => number
            .parse::<u64>()
            .ok()
            .and_then(|n| n.checked_add(1))
            .ok_or(ErrorCode::InternalServerError)?,
    };

    let formatted = format!("{next:0width$}", width = ACCOUNT_NUMBER_LENGTH);
    if formatted.len() != ACCOUNT_NUMBER_LENGTH {
        return Err(ErrorCode::InternalServerError);
    }
    Ok(formatted)
}
