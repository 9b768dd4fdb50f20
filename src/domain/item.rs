use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SchedulerConfig;
use crate::srs::SchedulerError;

/// Which face of a card is being tested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
  FrontToBack,
  BackToFront,
}

impl Direction {
  pub fn both() -> [Direction; 2] {
    [Direction::FrontToBack, Direction::BackToFront]
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::FrontToBack => "front_to_back",
      Self::BackToFront => "back_to_front",
    }
  }

  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "front_to_back" => Some(Self::FrontToBack),
      "back_to_front" => Some(Self::BackToFront),
      _ => None,
    }
  }
}

/// Memory state of a review item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemState {
  New,
  Learning,
  Review,
  Relearning,
}

impl ItemState {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::New => "New",
      Self::Learning => "Learning",
      Self::Review => "Review",
      Self::Relearning => "Relearning",
    }
  }

  /// Unlike a lenient parse, an unknown state is corrupted data and is reported.
  pub fn from_str(s: &str) -> Result<Self, SchedulerError> {
    match s {
      "New" => Ok(Self::New),
      "Learning" => Ok(Self::Learning),
      "Review" => Ok(Self::Review),
      "Relearning" => Ok(Self::Relearning),
      other => Err(SchedulerError::InvalidState(format!(
        "unknown item state '{}'",
        other
      ))),
    }
  }

  /// True for the two states that walk a step sequence
  pub fn is_learning_phase(&self) -> bool {
    matches!(self, Self::Learning | Self::Relearning)
  }
}

/// One learner's memory state for one (card, direction) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewItem {
  pub id: i64,
  pub user_id: i64,
  pub card_id: i64,
  pub direction: Direction,
  pub state: ItemState,
  /// Days; fractional values allowed
  pub interval: f64,
  pub ease_factor: f64,
  pub repetitions: u32,
  /// Only meaningful while Learning/Relearning
  pub step_index: usize,
  pub due_date: DateTime<Utc>,
  pub last_reviewed: Option<DateTime<Utc>>,
  /// When the item first left New; cleared by an administrative history reset
  pub introduced_at: Option<DateTime<Utc>>,
  /// Optimistic-concurrency token, owned by the store
  pub version: i64,
}

impl ReviewItem {
  pub fn new(
    id: i64,
    user_id: i64,
    card_id: i64,
    direction: Direction,
    now: DateTime<Utc>,
    config: &SchedulerConfig,
  ) -> Self {
    Self {
      id,
      user_id,
      card_id,
      direction,
      state: ItemState::New,
      interval: 0.0,
      ease_factor: config.default_ease,
      repetitions: 0,
      step_index: 0,
      due_date: now,
      last_reviewed: None,
      introduced_at: None,
      version: 0,
    }
  }

  pub fn is_due(&self, now: DateTime<Utc>) -> bool {
    now >= self.due_date
  }
}
