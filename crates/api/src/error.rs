//! Error rendering for HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tally_db::{AccountError, TransactionError};
use tally_shared::{AppError, ErrorCode};
use tracing::error;

/// Error body returned for every failed request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Stable machine-readable code.
    pub error_code: &'static str,
    /// Stable human-readable description of the code.
    pub error_message: String,
}

/// Handler error rendered as `{"errorCode", "errorMessage"}`.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<ErrorCode> for ApiError {
    fn from(code: ErrorCode) -> Self {
        Self(AppError::Business(code))
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        Self(err.into())
    }
}

impl From<TransactionError> for ApiError {
    fn from(err: TransactionError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self.0 {
            AppError::Business(_) => {}
            AppError::Database(detail) | AppError::Internal(detail) => {
                error!(error = %detail, "Request failed");
            }
        }

        let code = self.0.error_code();
        let status =
            StatusCode::from_u16(code.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        (
            status,
            Json(ErrorResponse {
                error_code: code.code(),
                error_message: code.to_string(),
            }),
        )
            .into_response()
    }
}
