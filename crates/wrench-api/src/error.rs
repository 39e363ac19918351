//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Only read endpoints produce these — a malformed key must be
//! distinguishable (client error) from a resource that simply isn't there.
//! Mutations report through the service's result object instead.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use wrench_core::Error as CoreError;

/// An error returned by a read handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("internal error: {0}")]
  Internal(String),
}

impl From<CoreError> for ApiError {
  fn from(e: CoreError) -> Self {
    match &e {
      CoreError::InvalidKeyFormat(_)
      | CoreError::WrongKeyKind { .. }
      | CoreError::InvalidEnumValue { .. } => Self::BadRequest(e.to_string()),
      CoreError::NotFound(_) | CoreError::EventNotFound(_) => {
        Self::NotFound(e.to_string())
      }
      _ => Self::Internal(e.to_string()),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m.clone()),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
