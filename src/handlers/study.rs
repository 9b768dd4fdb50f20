use axum::{
  extract::{Path, Query, State},
  Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::domain::{Grade, GradeInput, ReviewItem};
use crate::services::{self, ServiceError};
use crate::srs::QueueStats;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct QueueParams {
  pub extra_new: Option<i64>,
  #[serde(default)]
  pub show_all: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueueResponse {
  pub queue: Vec<ReviewItem>,
  pub stats: QueueStats,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
  /// Missing grades fall through to the invalid-grade error
  #[serde(default)]
  pub grade: GradeInput,
}

pub async fn get_queue(
  State(state): State<AppState>,
  Path(user_id): Path<i64>,
  Query(params): Query<QueueParams>,
) -> Result<Json<QueueResponse>, ApiError> {
  let (queue, stats) = services::load_queue(
    state.store.as_ref(),
    user_id,
    Utc::now(),
    state.config.max_new_per_day,
    params.extra_new,
    params.show_all,
  )?;
  Ok(Json(QueueResponse { queue, stats }))
}

pub async fn get_item(
  State(state): State<AppState>,
  Path((user_id, item_id)): Path<(i64, i64)>,
) -> Result<Json<ReviewItem>, ApiError> {
  state
    .store
    .load_item(user_id, item_id)?
    .map(Json)
    .ok_or(ApiError(ServiceError::NotFound { user_id, item_id }))
}

pub async fn submit_review(
  State(state): State<AppState>,
  Path((user_id, item_id)): Path<(i64, i64)>,
  Json(request): Json<ReviewRequest>,
) -> Result<Json<ReviewItem>, ApiError> {
  let grade = Grade::try_from(request.grade)?;
  let item = services::submit_grade(
    state.store.as_ref(),
    &state.config.scheduler,
    user_id,
    item_id,
    grade,
    Utc::now(),
  )?;
  Ok(Json(item))
}
