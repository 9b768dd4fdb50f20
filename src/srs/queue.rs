//! Daily review queue assembly.
//!
//! Due items (Learning/Review/Relearning with `due_date <= now`) come first in
//! due order, followed by as many New items as today's allotment permits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::daily_limit::new_cards_introduced_today;
use crate::domain::{ItemState, ReviewItem};

/// Summary numbers shown alongside a queue
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
  pub due_count: usize,
  /// All New items, not only the queued ones
  pub new_count: usize,
  pub learning_count: usize,
  pub total_count: usize,
  /// Unused new-item allotment after this queue; zero in show-all mode
  pub new_remaining_today: usize,
  pub introduced_today: usize,
}

/// Build today's session queue from a user's full item set.
///
/// `extra_new` widens today's allotment on top of `max_new_per_day`;
/// negative or absent means no extra. An empty item set yields an empty queue
/// with all-zero stats. Identical inputs give identical output.
pub fn build_queue(
  items: &[ReviewItem],
  now: DateTime<Utc>,
  max_new_per_day: u32,
  extra_new: Option<i64>,
  show_all: bool,
) -> (Vec<ReviewItem>, QueueStats) {
  if items.is_empty() {
    return (Vec::new(), QueueStats::default());
  }

  let introduced_today = new_cards_introduced_today(items, now);

  let mut due: Vec<&ReviewItem> = items.iter().filter(|item| is_due_for_review(item, now)).collect();
  due.sort_by(|a, b| by_due_then_id(a, b));

  let mut new_items: Vec<&ReviewItem> = items
    .iter()
    .filter(|item| item.state == ItemState::New)
    .collect();
  new_items.sort_by_key(|item| item.id);

  let mut stats = QueueStats {
    due_count: due.len(),
    new_count: new_items.len(),
    learning_count: items.iter().filter(|item| item.state.is_learning_phase()).count(),
    total_count: items.len(),
    new_remaining_today: 0,
    introduced_today,
  };

  if show_all {
    let mut queue = items.to_vec();
    queue.sort_by(by_due_then_id);
    tracing::info!(
      total = stats.total_count,
      due = stats.due_count,
      "Built show-all queue"
    );
    return (queue, stats);
  }

  let remaining = new_allotment(max_new_per_day, extra_new, introduced_today);
  let take = remaining.min(new_items.len());

  let queue: Vec<ReviewItem> = due
    .into_iter()
    .chain(new_items.into_iter().take(take))
    .cloned()
    .collect();

  stats.new_remaining_today = remaining - take;

  tracing::info!(
    queued = queue.len(),
    due = stats.due_count,
    new_queued = take,
    introduced_today,
    new_remaining_today = stats.new_remaining_today,
    "Built review queue"
  );

  (queue, stats)
}

/// How many New items may still be introduced today
pub fn new_allotment(max_new_per_day: u32, extra_new: Option<i64>, introduced_today: usize) -> usize {
  let base = (max_new_per_day as usize).saturating_sub(introduced_today);
  let extra = extra_new
    .filter(|n| *n > 0)
    .map(|n| usize::try_from(n).unwrap_or(usize::MAX))
    .unwrap_or(0);
  base.saturating_add(extra)
}

fn is_due_for_review(item: &ReviewItem, now: DateTime<Utc>) -> bool {
  match item.state {
    ItemState::Learning | ItemState::Review | ItemState::Relearning => item.is_due(now),
    ItemState::New => false,
  }
}

fn by_due_then_id(a: &ReviewItem, b: &ReviewItem) -> Ordering {
  a.due_date.cmp(&b.due_date).then(a.id.cmp(&b.id))
}
