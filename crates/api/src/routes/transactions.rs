//! Balance transaction routes.
//!
//! Use and cancel run under the account lock. When either is rejected by a
//! business rule, the attempt is recorded as a FAIL transaction before the
//! error is returned.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_core::{
    ledger::{TransactionResultType, TransactionSummary, TransactionType},
    lock::AccountLocked,
};
use tally_db::{TransactionError, TransactionRepository};
use tally_shared::ErrorCode;
use tracing::{error, info};
use validator::Validate;

use crate::{AppState, error::ApiError, extractors::ValidatedJson};

/// Creates the transaction routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/transaction/use", post(use_balance))
        .route("/transaction/cancel", post(cancel_balance))
        .route("/transaction/{transaction_id}", get(query_transaction))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for using balance.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UseBalanceRequest {
    /// Requesting account user.
    #[validate(range(min = 1))]
    pub user_id: i64,
    /// Account to debit.
    #[validate(length(equal = 10))]
    pub account_number: String,
    /// Amount to debit.
    #[validate(range(min = 10, max = 1_000_000_000))]
    pub amount: i64,
}

impl AccountLocked for UseBalanceRequest {
    fn account_number(&self) -> &str {
        &self.account_number
    }
}

/// Request body for cancelling a use.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CancelBalanceRequest {
    /// The use transaction to reverse.
    #[validate(length(min = 1))]
    pub transaction_id: String,
    /// Account the use was made on.
    #[validate(length(equal = 10))]
    pub account_number: String,
    /// Amount to return; must equal the original amount.
    #[validate(range(min = 10, max = 1_000_000_000))]
    pub amount: i64,
}

impl AccountLocked for CancelBalanceRequest {
    fn account_number(&self) -> &str {
        &self.account_number
    }
}

/// Response for a use or cancel.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    /// Account number.
    pub account_number: String,
    /// Success or fail.
    pub transaction_result: TransactionResultType,
    /// Transaction id.
    pub transaction_id: String,
    /// Requested amount.
    pub amount: i64,
    /// When the transaction happened.
    pub transacted_at: DateTime<Utc>,
}

impl From<TransactionSummary> for TransactionResponse {
    fn from(summary: TransactionSummary) -> Self {
        Self {
            account_number: summary.account_number,
            transaction_result: summary.result,
            transaction_id: summary.transaction_id,
            amount: summary.amount,
            transacted_at: summary.transacted_at,
        }
    }
}

/// Response for a transaction lookup.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryTransactionResponse {
    /// Account number.
    pub account_number: String,
    /// Use or cancel.
    pub transaction_type: TransactionType,
    /// Success or fail.
    pub transaction_result: TransactionResultType,
    /// Transaction id.
    pub transaction_id: String,
    /// Requested amount.
    pub amount: i64,
    /// When the transaction happened.
    pub transacted_at: DateTime<Utc>,
}

impl From<TransactionSummary> for QueryTransactionResponse {
    fn from(summary: TransactionSummary) -> Self {
        Self {
            account_number: summary.account_number,
            transaction_type: summary.transaction_type,
            transaction_result: summary.result,
            transaction_id: summary.transaction_id,
            amount: summary.amount,
            transacted_at: summary.transacted_at,
        }
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/transaction/use` - Debit an account.
async fn use_balance(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<UseBalanceRequest>,
) -> impl IntoResponse {
    let repo = TransactionRepository::new((*state.db).clone());

    let result = state
        .locks
        .with_lock(&request, || {
            repo.use_balance(request.user_id, &request.account_number, request.amount)
        })
        .await;

    match result {
        Ok(summary) => (StatusCode::OK, Json(TransactionResponse::from(summary))).into_response(),
        Err(err) => {
            let recorded = if is_recordable(&err) {
                Some(
                    repo.save_failed_use(&request.account_number, request.amount)
                        .await,
                )
            } else {
                None
            };
            reject(err, recorded)
        }
    }
}

/// POST `/transaction/cancel` - Reverse a use in full.
async fn cancel_balance(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CancelBalanceRequest>,
) -> impl IntoResponse {
    if request.transaction_id.trim().is_empty() {
        return ApiError::from(ErrorCode::InvalidRequest).into_response();
    }

    let repo = TransactionRepository::new((*state.db).clone());

    let result = state
        .locks
        .with_lock(&request, || {
            repo.cancel_balance(
                &request.transaction_id,
                &request.account_number,
                request.amount,
            )
        })
        .await;

    match result {
        Ok(summary) => (StatusCode::OK, Json(TransactionResponse::from(summary))).into_response(),
        Err(err) => {
            let recorded = if is_recordable(&err) {
                Some(
                    repo.save_failed_cancel(&request.account_number, request.amount)
                        .await,
                )
            } else {
                None
            };
            reject(err, recorded)
        }
    }
}

/// GET `/transaction/{transaction_id}` - Look up a transaction.
async fn query_transaction(
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> impl IntoResponse {
    let repo = TransactionRepository::new((*state.db).clone());

    match repo.query_transaction(&transaction_id).await {
        Ok(summary) => {
            (StatusCode::OK, Json(QueryTransactionResponse::from(summary))).into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

fn is_recordable(err: &TransactionError) -> bool {
    err.business_code().is_some_and(ErrorCode::is_recordable)
}

/// Renders a rejected use/cancel.
///
/// If recording the failure itself failed, that error is returned instead.
fn reject(
    err: TransactionError,
    recorded: Option<Result<TransactionSummary, TransactionError>>,
) -> Response {
    match recorded {
        Some(Ok(failure)) => {
            info!(
                account_number = %failure.account_number,
                transaction_id = %failure.transaction_id,
                reason = %err,
                "Transaction rejected"
            );
            ApiError::from(err).into_response()
        }
        Some(Err(record_err)) => {
            error!(
                reason = %err,
                error = %record_err,
                "Failed to record rejected transaction"
            );
            ApiError::from(record_err).into_response()
        }
        None => ApiError::from(err).into_response(),
    }
}
