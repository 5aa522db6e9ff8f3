//! Application-wide error types.
//!
//! [`ErrorCode`] enumerates every business rule the service can reject a
//! request with. Its `Display` text is shown to end users and must stay stable.
//! [`AppError`] is the boundary error: either a business rejection or an
//! unexpected failure whose detail is logged but never returned to the caller.

use thiserror::Error;

/// Business error codes surfaced to API callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ErrorCode {
    /// Unclassified failure.
    #[error("An internal server error occurred.")]
    InternalServerError,

    /// Malformed or out-of-range input.
    #[error("The request is invalid.")]
    InvalidRequest,

    /// No account user with the given id.
    #[error("User not found.")]
    UserNotFound,

    /// No account with the given account number.
    #[error("Account not found.")]
    AccountNotFound,

    /// The per-account lock could not be obtained.
    #[error("The account is in use by another transaction.")]
    AccountTransactionLock,

    /// Use amount is larger than the balance.
    #[error("The transaction amount exceeds the account balance.")]
    AmountExceedBalance,

    /// No transaction with the given transaction id.
    #[error("Transaction not found.")]
    TransactionNotFound,

    /// Requesting user does not own the account.
    #[error("The user is not the owner of this account.")]
    UserAccountUnmatch,

    /// The original transaction belongs to another account.
    #[error("This transaction did not occur on the given account.")]
    TransactionAccountUnmatch,

    /// Cancel amount differs from the original amount.
    #[error("Partial cancellation is not allowed.")]
    CancelMustFully,

    /// The original transaction is older than one year.
    #[error("Transactions older than one year cannot be cancelled.")]
    TooOldOrderToCancel,

    /// The account is already closed.
    #[error("The account is already unregistered.")]
    AccountAlreadyUnregistered,

    /// Closing an account that still holds money.
    #[error("An account with a remaining balance cannot be closed.")]
    BalanceNotEmpty,

    /// The user already owns the maximum number of accounts.
    #[error("A user can own at most 10 accounts.")]
    MaxAccountPerUser10,

    /// Only a successful use can be cancelled.
    #[error("Only a successful use transaction can be cancelled.")]
    TransactionNotCancellable,

    /// The use has already been cancelled.
    #[error("This transaction has already been cancelled.")]
    TransactionAlreadyCancelled,
}

impl ErrorCode {
    /// Returns the stable machine-readable code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::InternalServerError => "INTERNAL_SERVER_ERROR",
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::AccountNotFound => "ACCOUNT_NOT_FOUND",
            Self::AccountTransactionLock => "ACCOUNT_TRANSACTION_LOCK",
            Self::AmountExceedBalance => "AMOUNT_EXCEED_BALANCE",
            Self::TransactionNotFound => "TRANSACTION_NOT_FOUND",
            Self::UserAccountUnmatch => "USER_ACCOUNT_UNMATCH",
            Self::TransactionAccountUnmatch => "TRANSACTION_ACCOUNT_UNMATCH",
            Self::CancelMustFully => "CANCEL_MUST_FULLY",
            Self::TooOldOrderToCancel => "TOO_OLD_ORDER_TO_CANCEL",
            Self::AccountAlreadyUnregistered => "ACCOUNT_ALREADY_UNREGISTERED",
            Self::BalanceNotEmpty => "BALANCE_NOT_EMPTY",
            Self::MaxAccountPerUser10 => "MAX_ACCOUNT_PER_USER_10",
            Self::TransactionNotCancellable => "TRANSACTION_NOT_CANCELLABLE",
            Self::TransactionAlreadyCancelled => "TRANSACTION_ALREADY_CANCELLED",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(self) -> u16 {
        match self {
            Self::InternalServerError => 500,
            Self::UserNotFound | Self::AccountNotFound | Self::TransactionNotFound => 404,
            Self::AccountTransactionLock => 409,
            Self::InvalidRequest
            | Self::AmountExceedBalance
            | Self::UserAccountUnmatch
            | Self::TransactionAccountUnmatch
            | Self::CancelMustFully
            | Self::TooOldOrderToCancel
            | Self::AccountAlreadyUnregistered
            | Self::BalanceNotEmpty
            | Self::MaxAccountPerUser10
            | Self::TransactionNotCancellable
            | Self::TransactionAlreadyCancelled => 400,
        }
    }

    /// Whether a use/cancel request rejected with this code gets a FAIL record.
    ///
    /// Input validation and internal failures never reach the ledger.
    #[must_use]
    pub const fn is_recordable(self) -> bool {
        !matches!(self, Self::InternalServerError | Self::InvalidRequest)
    }
}

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Business rule violation with a stable code.
    #[error(transparent)]
    Business(#[from] ErrorCode),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the error code reported to the caller.
    ///
    /// Database and internal failures collapse into one generic code.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Business(code) => *code,
            Self::Database(_) | Self::Internal(_) => ErrorCode::InternalServerError,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        self.error_code().status_code()
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
