//! Daily new-card count, derived from review history.
//!
//! There is no stored counter: an item counts toward today's limit when it was
//! reviewed today and that was also the day it left New. Removing today's
//! history (see `db::ItemStore::delete_todays_history`) lowers the count with
//! no reset step here.

use chrono::{DateTime, NaiveTime, Utc};

use crate::domain::ReviewItem;

/// UTC midnight starting the day that contains `now`
pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
  now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

pub fn is_same_day(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
  a.date_naive() == b.date_naive()
}

/// Number of items whose first-ever review happened on `now`'s UTC day
pub fn new_cards_introduced_today(history: &[ReviewItem], now: DateTime<Utc>) -> usize {
  history
    .iter()
    .filter(|item| introduced_on_day_of(item, now))
    .count()
}

fn introduced_on_day_of(item: &ReviewItem, now: DateTime<Utc>) -> bool {
  match (item.last_reviewed, item.introduced_at) {
    (Some(last), Some(introduced)) => is_same_day(last, now) && is_same_day(introduced, now),
    _ => false,
  }
}
