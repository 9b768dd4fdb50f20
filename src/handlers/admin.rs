//! Item provisioning and the debug history reset

use axum::{
  extract::{Path, State},
  Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::domain::ReviewItem;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct ResetResponse {
  pub deleted: usize,
}

/// Create the two directional items of a card; repeat calls return the same items
pub async fn create_card_items(
  State(state): State<AppState>,
  Path((user_id, card_id)): Path<(i64, i64)>,
) -> Result<Json<Vec<ReviewItem>>, ApiError> {
  let items = state
    .store
    .create_items_for_card(user_id, card_id, Utc::now(), &state.config.scheduler)?;
  tracing::debug!(user_id, card_id, count = items.len(), "Card items ready");
  Ok(Json(items))
}

pub async fn reset_today(
  State(state): State<AppState>,
  Path(user_id): Path<i64>,
) -> Result<Json<ResetResponse>, ApiError> {
  let deleted = state.store.delete_todays_history(user_id, Utc::now())?;
  Ok(Json(ResetResponse { deleted }))
}
