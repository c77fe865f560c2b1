//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use roster_core::{
  ValidationError,
  store::{ClassifyError, ErrorClass},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error(transparent)]
  Invalid(#[from] ValidationError),

  #[error("payload too large: {0}")]
  PayloadTooLarge(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Map a backend error onto a response class.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + ClassifyError + Send + Sync + 'static,
  {
    let mapped = match e.class() {
      ErrorClass::NotFound(id) => Some(ApiError::NotFound(format!("student {id} not found"))),
      ErrorClass::Invalid(v) => Some(ApiError::Invalid(v.clone())),
      ErrorClass::Internal => None,
    };
    mapped.unwrap_or_else(|| ApiError::Store(Box::new(e)))
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, body) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, json!({ "error": m, "fields": [] })),
      ApiError::Invalid(v) => (
        StatusCode::BAD_REQUEST,
        json!({ "error": "validation failed", "fields": v.fields }),
      ),
      ApiError::PayloadTooLarge(m) => {
        (StatusCode::PAYLOAD_TOO_LARGE, json!({ "error": m, "fields": [] }))
      }
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": e.to_string(), "fields": [] }))
      }
    };
    (status, Json(body)).into_response()
  }
}
