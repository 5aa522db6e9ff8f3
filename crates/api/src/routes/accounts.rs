//! Account lifecycle routes.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_core::lock::AccountLocked;
use tally_db::AccountRepository;
use tally_shared::ErrorCode;
use tracing::error;
use validator::Validate;

use crate::{
    AppState,
    error::ApiError,
    extractors::{ValidatedJson, ValidatedQuery},
};

/// Creates the account routes.
pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/account",
        get(list_accounts).post(create_account).delete(delete_account),
    )
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for opening an account.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    /// Owning account user.
    #[validate(range(min = 1))]
    pub user_id: i64,
    /// Opening balance.
    #[validate(range(min = 0))]
    pub initial_balance: i64,
}

/// Response for an opened account.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountResponse {
    /// Owning account user.
    pub user_id: i64,
    /// Assigned account number.
    pub account_number: String,
    /// When the account was opened.
    pub registered_at: DateTime<Utc>,
}

/// Request body for closing an account.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAccountRequest {
    /// Owning account user.
    #[validate(range(min = 1))]
    pub user_id: i64,
    /// Account to close.
    #[validate(length(equal = 10))]
    pub account_number: String,
}

impl AccountLocked for DeleteAccountRequest {
    fn account_number(&self) -> &str {
        &self.account_number
    }
}

/// Response for a closed account.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAccountResponse {
    /// Owning account user.
    pub user_id: i64,
    /// Closed account number.
    pub account_number: String,
    /// When the account was closed.
    pub unregistered_at: DateTime<Utc>,
}

/// Query parameters for listing a user's accounts.
#[derive(Debug, Deserialize, Validate)]
pub struct ListAccountsQuery {
    /// Owning account user.
    #[validate(range(min = 1))]
    pub user_id: i64,
}

/// One entry of the account list.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    /// Account number.
    pub account_number: String,
    /// Current balance.
    pub balance: i64,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/account` - Open a new account.
async fn create_account(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateAccountRequest>,
) -> impl IntoResponse {
    let repo = AccountRepository::new((*state.db).clone());

    match repo
        .create_account(request.user_id, request.initial_balance)
        .await
    {
        Ok(account) => (
            StatusCode::OK,
            Json(CreateAccountResponse {
                user_id: account.user_id,
                account_number: account.account_number,
                registered_at: account.registered_at,
            }),
        )
            .into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// DELETE `/account` - Close an account.
///
/// Runs under the account lock so no use or cancel interleaves with it.
async fn delete_account(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<DeleteAccountRequest>,
) -> impl IntoResponse {
    let repo = AccountRepository::new((*state.db).clone());

    let result = state
        .locks
        .with_lock(&request, || {
            repo.close_account(request.user_id, &request.account_number)
        })
        .await;

    match result {
        Ok(account) => {
            let Some(unregistered_at) = account.unregistered_at else {
                error!(
                    account_number = %account.account_number,
                    "Closed account has no unregistration time"
                );
                return ApiError::from(ErrorCode::InternalServerError).into_response();
            };

            (
                StatusCode::OK,
                Json(DeleteAccountResponse {
                    user_id: account.user_id,
                    account_number: account.account_number,
                    unregistered_at,
                }),
            )
                .into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// GET `/account?user_id=` - List a user's accounts.
async fn list_accounts(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<ListAccountsQuery>,
) -> impl IntoResponse {
    let repo = AccountRepository::new((*state.db).clone());

    match repo.list_accounts(query.user_id).await {
        Ok(accounts) => {
            let response: Vec<AccountInfo> = accounts
                .into_iter()
                .map(|account| AccountInfo {
                    account_number: account.account_number,
                    balance: account.balance,
                })
                .collect();

            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}
