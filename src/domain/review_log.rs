use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Grade, ItemState, ReviewItem};

/// One applied grade, appended alongside every successful item save
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewLog {
  pub id: i64,
  pub item_id: i64,
  pub user_id: i64,
  pub grade: Grade,
  pub prior_state: ItemState,
  pub new_state: ItemState,
  pub reviewed_at: DateTime<Utc>,
}

impl ReviewLog {
  /// Describe the transition from `prior` to `next`
  pub fn for_transition(prior: &ReviewItem, next: &ReviewItem, grade: Grade) -> Self {
    Self {
      id: 0,
      item_id: next.id,
      user_id: next.user_id,
      grade,
      prior_state: prior.state,
      new_state: next.state,
      reviewed_at: next.last_reviewed.unwrap_or(next.due_date),
    }
  }
}
