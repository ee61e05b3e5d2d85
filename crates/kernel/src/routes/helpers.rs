//! Shared response envelopes and extractors for the JSON API.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::StatusCode;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// `{"data": ...}` envelope for single resources.
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}

/// Wrap a value in the `data` envelope.
pub fn data<T: Serialize>(value: T) -> Json<DataResponse<T>> {
    Json(DataResponse { data: value })
}

/// `201 Created` with the `data` envelope.
pub fn created<T: Serialize>(value: T) -> (StatusCode, Json<DataResponse<T>>) {
    (StatusCode::CREATED, data(value))
}

/// Plain acknowledgement body.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

pub fn message(message: &'static str) -> Json<MessageResponse> {
    Json(MessageResponse { message })
}

/// JSON request body whose rejections use the API error format.
///
/// Malformed JSON is a 400; well-formed JSON of the wrong shape is a 422.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(JsonRejection::JsonDataError(e)) => Err(AppError::Validation(e.body_text())),
            Err(rejection) => Err(AppError::BadRequest(rejection.body_text())),
        }
    }
}

/// Query string whose rejections use the API error format.
#[derive(Debug)]
pub struct QueryParams<T>(pub T);

impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| Self(value))
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
    }
}

/// `?direct_only=` flag for category post listings.
///
/// Any value other than `false` or `0` counts as set, so a bare
/// `?direct_only` works too.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScopeParams {
    pub direct_only: Option<String>,
}

impl ScopeParams {
    pub fn direct_only(&self) -> bool {
        self.direct_only
            .as_deref()
            .is_some_and(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "false" | "0"))
    }
}
