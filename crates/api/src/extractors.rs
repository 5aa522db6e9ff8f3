//! Request extractors that validate before the handler runs.
//!
//! Malformed bodies, bad query strings and failed field validation are all
//! rejected with `INVALID_REQUEST` in the standard error body.

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use tally_shared::ErrorCode;
use tracing::debug;
use validator::Validate;

use crate::error::ApiError;

/// JSON body that passed `validator` checks.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| {
                debug!(error = %rejection.body_text(), "Rejected request body");
                ApiError::from(ErrorCode::InvalidRequest)
            })?;

        value.validate().map_err(|e| {
            debug!(error = %e, "Request validation failed");
            ApiError::from(ErrorCode::InvalidRequest)
        })?;

        Ok(Self(value))
    }
}

/// Query string that passed `validator` checks.
#[derive(Debug)]
pub struct ValidatedQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                debug!(error = %rejection.body_text(), "Rejected query string");
                ApiError::from(ErrorCode::InvalidRequest)
            })?;

        value.validate().map_err(|e| {
            debug!(error = %e, "Query validation failed");
            ApiError::from(ErrorCode::InvalidRequest)
        })?;

        Ok(Self(value))
    }
}
