//! API error type and [`axum::response::IntoResponse`] implementation.

use aula_core::store::StoreError;
use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("conflict: {0}")]
  Conflict(String),

  /// `If-Match` did not match the current ETag.
  #[error("precondition failed: the gradebook changed since it was loaded")]
  PreconditionFailed,

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Classify a backend error: constraint violations become 409/400, the rest
  /// are internal.
  pub fn store<E: StoreError>(e: E) -> Self {
    if e.is_conflict() || e.is_in_use() {
      Self::Conflict(e.to_string())
    } else if e.is_missing_reference() {
      Self::BadRequest(e.to_string())
    } else {
      Self::Store(Box::new(e))
    }
  }
}

impl From<aula_core::Error> for ApiError {
  fn from(e: aula_core::Error) -> Self {
    use aula_core::Error as E;
    match e {
      E::StaffNotFound(_)
      | E::CourseNotFound(_)
      | E::SubjectNotFound(_)
      | E::StudentNotFound(_)
      | E::SubjectNotInCourse { .. } => Self::NotFound(e.to_string()),
      E::Forbidden(m) => Self::Forbidden(m),
      E::Invalid(_) | E::InvalidSlot(_) | E::UnknownVariant { .. } => {
        Self::BadRequest(e.to_string())
      }
      E::Store(inner) => Self::Store(inner),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
      ApiError::Conflict(_) => StatusCode::CONFLICT,
      ApiError::PreconditionFailed => StatusCode::PRECONDITION_FAILED,
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        StatusCode::INTERNAL_SERVER_ERROR
      }
    };
    let message = match self {
      ApiError::NotFound(m)
      | ApiError::BadRequest(m)
      | ApiError::Forbidden(m)
      | ApiError::Conflict(m) => m,
      other => other.to_string(),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use uuid::Uuid;

  use super::*;

  #[test]
  fn core_errors_map_to_statuses() {
    let cases = [
      (aula_core::Error::CourseNotFound(Uuid::nil()), StatusCode::NOT_FOUND),
      (aula_core::Error::Forbidden("no".into()), StatusCode::FORBIDDEN),
      (aula_core::Error::Invalid("blank".into()), StatusCode::BAD_REQUEST),
      (aula_core::Error::InvalidSlot(11), StatusCode::BAD_REQUEST),
    ];
    for (err, status) in cases {
      assert_eq!(ApiError::from(err).into_response().status(), status);
    }
  }
}
