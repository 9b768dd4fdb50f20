//! JSON HTTP surface over the review services.
//!
//! Identity comes from the path; there is no authentication layer.

pub mod admin;
pub mod study;

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  routing::{get, post},
  Json, Router,
};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::db::StoreError;
use crate::services::ServiceError;
use crate::srs::SchedulerError;
use crate::state::AppState;

pub use admin::{create_card_items, reset_today};
pub use study::{get_item, get_queue, submit_review};

pub fn router(state: AppState) -> Router {
  Router::new()
    .route("/users/{user_id}/queue", get(get_queue))
    .route("/users/{user_id}/items/{item_id}", get(get_item))
    .route("/users/{user_id}/items/{item_id}/review", post(submit_review))
    .route("/users/{user_id}/cards/{card_id}", post(create_card_items))
    .route("/users/{user_id}/reset-today", post(reset_today))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

/// Error returned by every handler, rendered as `{"error": "..."}`
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match &self.0 {
      ServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
      ServiceError::RetriesExhausted { .. } => StatusCode::CONFLICT,
      ServiceError::Scheduler(SchedulerError::InvalidGrade(_)) => StatusCode::BAD_REQUEST,
      ServiceError::Scheduler(_) => StatusCode::INTERNAL_SERVER_ERROR,
      ServiceError::Store(StoreError::Conflict { .. }) => StatusCode::CONFLICT,
      ServiceError::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
      ServiceError::Store(StoreError::InvalidData(_)) => StatusCode::INTERNAL_SERVER_ERROR,
      ServiceError::Store(StoreError::LockPoisoned | StoreError::Database(_)) => {
        StatusCode::SERVICE_UNAVAILABLE
      }
    }
  }
}

impl From<ServiceError> for ApiError {
  fn from(err: ServiceError) -> Self {
    ApiError(err)
  }
}

impl From<StoreError> for ApiError {
  fn from(err: StoreError) -> Self {
    ApiError(err.into())
  }
}

impl From<SchedulerError> for ApiError {
  fn from(err: SchedulerError) -> Self {
    ApiError(err.into())
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!("Request failed: {}", self.0);
    } else {
      tracing::debug!("Request rejected ({}): {}", status, self.0);
    }
    (status, Json(json!({ "error": self.0.to_string() }))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_error_status_mapping() {
    let cases = [
      (ServiceError::NotFound { user_id: 1, item_id: 2 }, StatusCode::NOT_FOUND),
      (
        ServiceError::Scheduler(SchedulerError::InvalidGrade("meh".into())),
        StatusCode::BAD_REQUEST,
      ),
      (
        ServiceError::Scheduler(SchedulerError::InvalidState("x".into())),
        StatusCode::INTERNAL_SERVER_ERROR,
      ),
      (
        ServiceError::Scheduler(SchedulerError::ConfigurationError("x".into())),
        StatusCode::INTERNAL_SERVER_ERROR,
      ),
      (
        ServiceError::RetriesExhausted { item_id: 1, attempts: 3 },
        StatusCode::CONFLICT,
      ),
      (
        ServiceError::Store(StoreError::Conflict { item_id: 1, expected_version: 0 }),
        StatusCode::CONFLICT,
      ),
      (ServiceError::Store(StoreError::LockPoisoned), StatusCode::SERVICE_UNAVAILABLE),
    ];

    for (err, expected) in cases {
      assert_eq!(ApiError(err).status(), expected);
    }
  }

  #[test]
  fn test_store_not_found_becomes_service_not_found() {
    let err = ApiError::from(StoreError::NotFound { user_id: 3, item_id: 4 });
    assert!(matches!(err.0, ServiceError::NotFound { user_id: 3, item_id: 4 }));
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
  }
}
