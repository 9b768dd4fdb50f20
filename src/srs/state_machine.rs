//! Review item state machine.
//!
//! `apply_grade` maps (item, grade, now) to the next item state:
//!
//! - New: any grade starts learning. The first presentation counts as
//!   passing step 0, so the item lands on step 1 (or stays on step 0 when
//!   there is only one learning step).
//! - Learning/Relearning: Again restarts the steps, Hard repeats the current
//!   step, Good advances (graduating after the last step), Easy graduates
//!   immediately.
//! - Review: Again lapses into Relearning, Hard/Good/Easy grow the interval
//!   by the hard factor, the ease factor, or ease times the easy bonus.
//!
//! The function is pure: it clones the input and never touches I/O.

use chrono::{DateTime, Duration, Utc};

use super::SchedulerError;
use crate::config::SchedulerConfig;
use crate::domain::{Grade, ItemState, ReviewItem};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Apply a learner's grade to an item, returning the rescheduled item
pub fn apply_grade(
  item: &ReviewItem,
  grade: Grade,
  now: DateTime<Utc>,
  config: &SchedulerConfig,
) -> Result<ReviewItem, SchedulerError> {
  config.validate()?;
  check_integrity(item, config)?;

  let mut next = item.clone();
  next.last_reviewed = Some(now);

  match item.state {
    ItemState::New => start_learning(&mut next, now, config)?,
    ItemState::Learning => advance_steps(&mut next, grade, now, &config.learning_steps, config)?,
    ItemState::Relearning => {
      advance_steps(&mut next, grade, now, &config.relearning_steps, config)?
    }
    ItemState::Review => review(&mut next, grade, now, config)?,
  }

  // Ease is frozen outside Review/Relearning; those states also lift items
  // persisted under an older, lower floor.
  if matches!(item.state, ItemState::Review | ItemState::Relearning) {
    next.ease_factor = next.ease_factor.max(config.min_ease);
  }

  tracing::debug!(
    item_id = item.id,
    grade = grade.as_str(),
    from = item.state.as_str(),
    to = next.state.as_str(),
    step = next.step_index,
    interval = next.interval,
    ease = next.ease_factor,
    due = %next.due_date,
    "Applied grade"
  );

  Ok(next)
}

/// Step sequence walked by an item in the given state, if any
pub fn steps_for_state(state: ItemState, config: &SchedulerConfig) -> Option<&[i64]> {
  match state {
    ItemState::Learning => Some(config.learning_steps.as_slice()),
    ItemState::Relearning => Some(config.relearning_steps.as_slice()),
    ItemState::New | ItemState::Review => None,
  }
}

fn check_integrity(item: &ReviewItem, config: &SchedulerConfig) -> Result<(), SchedulerError> {
  if let Some(steps) = steps_for_state(item.state, config) {
    if item.step_index >= steps.len() {
      return Err(SchedulerError::InvalidState(format!(
        "item {} is {} at step {} but only {} steps are configured",
        item.id,
        item.state.as_str(),
        item.step_index,
        steps.len()
      )));
    }
  }
  if !item.interval.is_finite() || item.interval < 0.0 {
    return Err(SchedulerError::InvalidState(format!(
      "item {} has interval {}",
      item.id, item.interval
    )));
  }
  if !item.ease_factor.is_finite() {
    return Err(SchedulerError::InvalidState(format!(
      "item {} has ease factor {}",
      item.id, item.ease_factor
    )));
  }
  Ok(())
}

/// New → Learning; the grade does not vary this transition
fn start_learning(
  item: &mut ReviewItem,
  now: DateTime<Utc>,
  config: &SchedulerConfig,
) -> Result<(), SchedulerError> {
  let steps = &config.learning_steps;
  let step_index = if steps.len() > 1 { 1 } else { 0 };

  item.state = ItemState::Learning;
  item.step_index = step_index;
  item.due_date = due_in_minutes(now, steps[step_index])?;
  item.introduced_at.get_or_insert(now);
  Ok(())
}

/// Shared step progression for Learning and Relearning
fn advance_steps(
  item: &mut ReviewItem,
  grade: Grade,
  now: DateTime<Utc>,
  steps: &[i64],
  config: &SchedulerConfig,
) -> Result<(), SchedulerError> {
  let current = item.step_index;

  match grade {
    Grade::Again => {
      item.step_index = 0;
      item.due_date = due_in_minutes(now, steps[0])?;
    }
    Grade::Hard => {
      item.due_date = due_in_minutes(now, steps[current])?;
    }
    Grade::Good if current + 1 < steps.len() => {
      item.step_index = current + 1;
      item.due_date = due_in_minutes(now, steps[current + 1])?;
    }
    Grade::Good => {
      let interval = graduation_interval(item, false, config);
      graduate(item, interval, now)?;
    }
    Grade::Easy => {
      let interval = graduation_interval(item, true, config);
      graduate(item, interval, now)?;
    }
  }
  Ok(())
}

/// First graduation resets to the graduating interval; relearning keeps
/// partial credit for the pre-lapse interval.
fn graduation_interval(item: &ReviewItem, easy: bool, config: &SchedulerConfig) -> f64 {
  let interval = match (item.state, easy) {
    (ItemState::Relearning, _) => config
      .graduating_interval
      .max(item.interval * config.relearn_interval_factor),
    (_, true) => config.graduating_interval * config.easy_bonus,
    (_, false) => config.graduating_interval,
  };
  interval.min(config.maximum_interval)
}

fn graduate(item: &mut ReviewItem, interval: f64, now: DateTime<Utc>) -> Result<(), SchedulerError> {
  item.state = ItemState::Review;
  item.step_index = 0;
  item.interval = interval;
  item.repetitions = 1;
  item.due_date = due_in_days(now, interval)?;
  Ok(())
}

fn review(
  item: &mut ReviewItem,
  grade: Grade,
  now: DateTime<Utc>,
  config: &SchedulerConfig,
) -> Result<(), SchedulerError> {
  match grade {
    Grade::Again => {
      // interval is kept; it is scaled down only when relearning completes
      item.ease_factor = (item.ease_factor - config.lapse_ease_delta).max(config.min_ease);
      item.repetitions = 0;
      item.state = ItemState::Relearning;
      item.step_index = 0;
      item.due_date = due_in_minutes(now, config.relearning_steps[0])?;
      return Ok(());
    }
    Grade::Hard => {
      item.interval = grow(item.interval, config.hard_interval_factor, config);
      item.ease_factor = (item.ease_factor - config.ease_delta / 2.0).max(config.min_ease);
    }
    Grade::Good => {
      item.interval = grow(item.interval, item.ease_factor, config);
      item.repetitions += 1;
    }
    Grade::Easy => {
      item.interval = grow(item.interval, item.ease_factor * config.easy_bonus, config);
      item.ease_factor += config.ease_delta;
      item.repetitions += 1;
    }
  }
  item.due_date = due_in_days(now, item.interval)?;
  Ok(())
}

/// Multiply an interval, capping at the maximum without ever shrinking
/// an interval that already sits above it.
fn grow(interval: f64, factor: f64, config: &SchedulerConfig) -> f64 {
  (interval * factor).min(config.maximum_interval.max(interval))
}

fn due_in_minutes(now: DateTime<Utc>, minutes: i64) -> Result<DateTime<Utc>, SchedulerError> {
  Duration::try_minutes(minutes)
    .and_then(|d| now.checked_add_signed(d))
    .ok_or_else(|| {
      SchedulerError::ConfigurationError(format!("step of {} minutes is out of range", minutes))
    })
}

fn due_in_days(now: DateTime<Utc>, days: f64) -> Result<DateTime<Utc>, SchedulerError> {
  Duration::try_seconds((days * SECONDS_PER_DAY).round() as i64)
    .and_then(|d| now.checked_add_signed(d))
    .ok_or_else(|| SchedulerError::InvalidState(format!("interval of {} days is out of range", days)))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::Direction;
  use chrono::TimeZone;

  const EPS: f64 = 1e-9;

  fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
  }

  fn make_item(state: ItemState) -> ReviewItem {
    let mut item = ReviewItem::new(
      1,
      1,
      100,
      Direction::FrontToBack,
      now(),
      &SchedulerConfig::default(),
    );
    item.state = state;
    item
  }

  fn review_item(interval: f64, ease: f64, repetitions: u32) -> ReviewItem {
    let mut item = make_item(ItemState::Review);
    item.interval = interval;
    item.ease_factor = ease;
    item.repetitions = repetitions;
    item
  }

  fn all_states() -> Vec<ReviewItem> {
    let config = SchedulerConfig::default();
    let mut items = vec![make_item(ItemState::New), review_item(10.0, 1.3, 4)];
    for step in 0..config.learning_steps.len() {
      let mut item = make_item(ItemState::Learning);
      item.step_index = step;
      items.push(item);
    }
    for step in 0..config.relearning_steps.len() {
      let mut item = make_item(ItemState::Relearning);
      item.step_index = step;
      item.interval = 30.0;
      items.push(item);
    }
    items
  }

  #[test]
  fn test_new_item_good_enters_learning_step_one() {
    let config = SchedulerConfig {
      learning_steps: vec![1, 10],
      ..SchedulerConfig::default()
    };
    let item = make_item(ItemState::New);

    let result = apply_grade(&item, Grade::Good, now(), &config).unwrap();

    assert_eq!(result.state, ItemState::Learning);
    assert_eq!(result.step_index, 1);
    assert_eq!(result.due_date, now() + Duration::minutes(10));
    assert_eq!(result.last_reviewed, Some(now()));
    assert_eq!(result.introduced_at, Some(now()));
  }

  #[test]
  fn test_new_item_transition_ignores_grade() {
    let config = SchedulerConfig::default();
    let item = make_item(ItemState::New);
    let expected = apply_grade(&item, Grade::Good, now(), &config).unwrap();

    for grade in Grade::ALL {
      let result = apply_grade(&item, grade, now(), &config).unwrap();
      assert_eq!(result, expected, "grade {:?} changed the New transition", grade);
    }
  }

  #[test]
  fn test_new_item_single_learning_step() {
    let config = SchedulerConfig {
      learning_steps: vec![5],
      ..SchedulerConfig::default()
    };
    let result = apply_grade(&make_item(ItemState::New), Grade::Easy, now(), &config).unwrap();

    assert_eq!(result.state, ItemState::Learning);
    assert_eq!(result.step_index, 0);
    assert_eq!(result.due_date, now() + Duration::minutes(5));
  }

  #[test]
  fn test_review_good_multiplies_by_ease() {
    let item = review_item(10.0, 2.5, 3);
    let result = apply_grade(&item, Grade::Good, now(), &SchedulerConfig::default()).unwrap();

    assert_eq!(result.state, ItemState::Review);
    assert!((result.interval - 25.0).abs() < EPS);
    assert!((result.ease_factor - 2.5).abs() < EPS);
    assert_eq!(result.repetitions, 4);
    assert_eq!(result.due_date, now() + Duration::days(25));
  }

  #[test]
  fn test_review_again_lapses_into_relearning() {
    let config = SchedulerConfig {
      lapse_ease_delta: 0.2,
      ..SchedulerConfig::default()
    };
    let item = review_item(10.0, 2.5, 3);
    let result = apply_grade(&item, Grade::Again, now(), &config).unwrap();

    assert!((result.ease_factor - 2.3).abs() < EPS);
    assert_eq!(result.state, ItemState::Relearning);
    assert_eq!(result.step_index, 0);
    assert_eq!(result.repetitions, 0);
    // pre-lapse interval retained until relearning completes
    assert!((result.interval - 10.0).abs() < EPS);
    assert_eq!(result.due_date, now() + Duration::minutes(config.relearning_steps[0]));
  }

  #[test]
  fn test_review_hard_uses_hard_factor() {
    let config = SchedulerConfig::default();
    let item = review_item(10.0, 2.5, 3);
    let result = apply_grade(&item, Grade::Hard, now(), &config).unwrap();

    assert!((result.interval - 12.0).abs() < EPS);
    assert!((result.ease_factor - (2.5 - config.ease_delta / 2.0)).abs() < EPS);
    assert_eq!(result.state, ItemState::Review);
    assert_eq!(result.repetitions, 3);
  }

  #[test]
  fn test_review_easy_applies_bonus_and_raises_ease() {
    let config = SchedulerConfig::default();
    let item = review_item(10.0, 2.5, 3);
    let result = apply_grade(&item, Grade::Easy, now(), &config).unwrap();

    assert!((result.interval - 10.0 * 2.5 * config.easy_bonus).abs() < EPS);
    assert!((result.ease_factor - (2.5 + config.ease_delta)).abs() < EPS);
    assert_eq!(result.repetitions, 4);
  }

  #[test]
  fn test_learning_progression_and_graduation() {
    let config = SchedulerConfig {
      learning_steps: vec![1, 10, 60],
      graduating_interval: 1.0,
      ..SchedulerConfig::default()
    };
    let mut item = apply_grade(&make_item(ItemState::New), Grade::Good, now(), &config).unwrap();
    assert_eq!(item.step_index, 1);

    item = apply_grade(&item, Grade::Good, now(), &config).unwrap();
    assert_eq!(item.state, ItemState::Learning);
    assert_eq!(item.step_index, 2);
    assert_eq!(item.due_date, now() + Duration::minutes(60));

    item = apply_grade(&item, Grade::Good, now(), &config).unwrap();
    assert_eq!(item.state, ItemState::Review);
    assert!((item.interval - 1.0).abs() < EPS);
    assert_eq!(item.repetitions, 1);
    assert_eq!(item.due_date, now() + Duration::days(1));
    // ease untouched while learning
    assert!((item.ease_factor - config.default_ease).abs() < EPS);
  }

  #[test]
  fn test_learning_again_and_hard() {
    let config = SchedulerConfig {
      learning_steps: vec![1, 10, 60],
      ..SchedulerConfig::default()
    };
    let mut item = make_item(ItemState::Learning);
    item.step_index = 2;

    let hard = apply_grade(&item, Grade::Hard, now(), &config).unwrap();
    assert_eq!(hard.step_index, 2);
    assert_eq!(hard.due_date, now() + Duration::minutes(60));

    let again = apply_grade(&item, Grade::Again, now(), &config).unwrap();
    assert_eq!(again.state, ItemState::Learning);
    assert_eq!(again.step_index, 0);
    assert_eq!(again.due_date, now() + Duration::minutes(1));
  }

  #[test]
  fn test_learning_easy_graduates_with_bonus() {
    let config = SchedulerConfig::default();
    let item = make_item(ItemState::Learning);
    let result = apply_grade(&item, Grade::Easy, now(), &config).unwrap();

    assert_eq!(result.state, ItemState::Review);
    assert!((result.interval - config.graduating_interval * config.easy_bonus).abs() < EPS);
    assert_eq!(result.repetitions, 1);
  }

  #[test]
  fn test_relearning_keeps_partial_credit() {
    let config = SchedulerConfig {
      relearning_steps: vec![10],
      relearn_interval_factor: 0.5,
      graduating_interval: 1.0,
      ..SchedulerConfig::default()
    };
    let lapsed = apply_grade(&review_item(40.0, 2.5, 6), Grade::Again, now(), &config).unwrap();
    let result = apply_grade(&lapsed, Grade::Good, now(), &config).unwrap();

    assert_eq!(result.state, ItemState::Review);
    assert!((result.interval - 20.0).abs() < EPS);
    assert_eq!(result.repetitions, 1);
    // ease keeps the lapse penalty
    assert!((result.ease_factor - 2.3).abs() < EPS);
  }

  #[test]
  fn test_relearning_never_below_graduating_interval() {
    let config = SchedulerConfig {
      relearn_interval_factor: 0.1,
      graduating_interval: 2.0,
      ..SchedulerConfig::default()
    };
    let mut item = make_item(ItemState::Relearning);
    item.interval = 5.0;

    let result = apply_grade(&item, Grade::Easy, now(), &config).unwrap();
    assert_eq!(result.state, ItemState::Review);
    assert!((result.interval - 2.0).abs() < EPS);
  }

  #[test]
  fn test_relearning_step_progression() {
    let config = SchedulerConfig {
      relearning_steps: vec![10, 30],
      ..SchedulerConfig::default()
    };
    let lapsed = apply_grade(&review_item(40.0, 2.1, 5), Grade::Again, now(), &config).unwrap();
    assert_eq!(lapsed.state, ItemState::Relearning);
    assert_eq!(lapsed.step_index, 0);
    assert_eq!(lapsed.due_date, now() + Duration::minutes(10));
    let lapse_ease = lapsed.ease_factor;

    // Good on a non-final step advances without graduating
    let step_one = apply_grade(&lapsed, Grade::Good, now(), &config).unwrap();
    assert_eq!(step_one.state, ItemState::Relearning);
    assert_eq!(step_one.step_index, 1);
    assert_eq!(step_one.due_date, now() + Duration::minutes(30));
    assert!((step_one.interval - 40.0).abs() < EPS);
    assert!((step_one.ease_factor - lapse_ease).abs() < EPS);

    // Hard repeats the current step
    let hard = apply_grade(&step_one, Grade::Hard, now(), &config).unwrap();
    assert_eq!(hard.state, ItemState::Relearning);
    assert_eq!(hard.step_index, 1);
    assert_eq!(hard.due_date, now() + Duration::minutes(30));
    assert!((hard.interval - 40.0).abs() < EPS);
    assert!((hard.ease_factor - lapse_ease).abs() < EPS);

    // Again restarts the steps and leaves ease and the pre-lapse interval alone
    let again = apply_grade(&step_one, Grade::Again, now(), &config).unwrap();
    assert_eq!(again.state, ItemState::Relearning);
    assert_eq!(again.step_index, 0);
    assert_eq!(again.due_date, now() + Duration::minutes(10));
    assert!((again.interval - 40.0).abs() < EPS);
    assert!((again.ease_factor - lapse_ease).abs() < EPS);
    assert_eq!(again.repetitions, 0);

    let graduated = apply_grade(&step_one, Grade::Good, now(), &config).unwrap();
    assert_eq!(graduated.state, ItemState::Review);
    assert!((graduated.interval - 20.0).abs() < EPS);
    assert_eq!(graduated.repetitions, 1);
  }

  #[test]
  fn test_raised_floor_leaves_learning_ease_alone() {
    let config = SchedulerConfig {
      min_ease: 2.0,
      ..SchedulerConfig::default()
    };
    let mut learning = make_item(ItemState::Learning);
    learning.ease_factor = 1.5;

    for grade in [Grade::Again, Grade::Hard, Grade::Good] {
      let result = apply_grade(&learning, grade, now(), &config).unwrap();
      assert_eq!(result.state, ItemState::Learning);
      assert!((result.ease_factor - 1.5).abs() < EPS);
    }

    let result = apply_grade(&review_item(10.0, 1.5, 2), Grade::Good, now(), &config).unwrap();
    assert!((result.ease_factor - 2.0).abs() < EPS);
  }

  #[test]
  fn test_ease_never_below_floor() {
    let config = SchedulerConfig::default();
    for item in all_states() {
      for grade in Grade::ALL {
        let result = apply_grade(&item, grade, now(), &config).unwrap();
        assert!(
          result.ease_factor >= config.min_ease,
          "{:?} + {:?} gave ease {}",
          item.state,
          grade,
          result.ease_factor
        );
      }
    }
  }

  #[test]
  fn test_repeated_lapses_clamp_ease() {
    let config = SchedulerConfig::default();
    let mut item = review_item(10.0, 1.4, 2);
    for _ in 0..5 {
      item = apply_grade(&item, Grade::Again, now(), &config).unwrap();
      item = apply_grade(&item, Grade::Good, now(), &config).unwrap();
    }
    assert!((item.ease_factor - config.min_ease).abs() < EPS);
  }

  #[test]
  fn test_step_index_stays_in_range() {
    let config = SchedulerConfig::default();
    for item in all_states() {
      for grade in Grade::ALL {
        let result = apply_grade(&item, grade, now(), &config).unwrap();
        if let Some(steps) = steps_for_state(result.state, &config) {
          assert!(result.step_index < steps.len());
        }
        assert!(result.due_date >= now());
      }
    }
  }

  #[test]
  fn test_review_success_never_shrinks_interval() {
    let config = SchedulerConfig::default();
    for interval in [0.5, 1.0, 7.0, 120.0, 36_500.0] {
      let item = review_item(interval, config.min_ease, 3);
      for grade in [Grade::Good, Grade::Easy] {
        let result = apply_grade(&item, grade, now(), &config).unwrap();
        assert!(result.interval >= interval);
      }
      let lapsed = apply_grade(&item, Grade::Again, now(), &config).unwrap();
      assert_eq!(lapsed.state, ItemState::Relearning);
    }
  }

  #[test]
  fn test_interval_capped_at_maximum() {
    let config = SchedulerConfig {
      maximum_interval: 100.0,
      ..SchedulerConfig::default()
    };
    let result = apply_grade(&review_item(80.0, 2.5, 5), Grade::Good, now(), &config).unwrap();
    assert!((result.interval - 100.0).abs() < EPS);
  }

  #[test]
  fn test_input_not_mutated_and_version_kept() {
    let mut item = review_item(10.0, 2.5, 3);
    item.version = 7;
    let before = item.clone();

    let result = apply_grade(&item, Grade::Easy, now(), &SchedulerConfig::default()).unwrap();

    assert_eq!(item, before);
    assert_eq!(result.version, 7);
  }

  #[test]
  fn test_introduced_at_set_only_once() {
    let config = SchedulerConfig::default();
    let first = apply_grade(&make_item(ItemState::New), Grade::Good, now(), &config).unwrap();
    let later = now() + Duration::hours(3);
    let second = apply_grade(&first, Grade::Good, later, &config).unwrap();

    assert_eq!(second.introduced_at, Some(now()));
    assert_eq!(second.last_reviewed, Some(later));
  }

  #[test]
  fn test_step_index_out_of_range_is_invalid_state() {
    let mut item = make_item(ItemState::Relearning);
    item.step_index = 3;
    let result = apply_grade(&item, Grade::Good, now(), &SchedulerConfig::default());
    assert!(matches!(result, Err(SchedulerError::InvalidState(_))));
  }

  #[test]
  fn test_corrupt_interval_is_invalid_state() {
    let item = review_item(f64::NAN, 2.5, 1);
    let result = apply_grade(&item, Grade::Good, now(), &SchedulerConfig::default());
    assert!(matches!(result, Err(SchedulerError::InvalidState(_))));
  }

  #[test]
  fn test_empty_steps_is_configuration_error() {
    let config = SchedulerConfig {
      learning_steps: vec![],
      ..SchedulerConfig::default()
    };
    let result = apply_grade(&make_item(ItemState::New), Grade::Good, now(), &config);
    assert!(matches!(result, Err(SchedulerError::ConfigurationError(_))));
  }
}
