//! Grade submission and queue loading on top of an `ItemStore`.
//!
//! Submission is read, recompute, conditional write. A conflicting write from
//! another session sends us back to the read with the fresh item, so the
//! saved result is always derived from what was actually stored.

use chrono::{DateTime, Utc};

use crate::config::SchedulerConfig;
use crate::db::{ItemStore, StoreError};
use crate::domain::{Grade, ReviewItem, ReviewLog};
use crate::srs::{apply_grade, build_queue, QueueStats, SchedulerError};

/// Attempts made before a contended submission gives up
pub const MAX_CONFLICT_RETRIES: u32 = 3;

#[derive(Debug)]
pub enum ServiceError {
    NotFound { user_id: i64, item_id: i64 },
    Scheduler(SchedulerError),
    Store(StoreError),
    RetriesExhausted { item_id: i64, attempts: u32 },
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::NotFound { user_id, item_id } => {
                write!(f, "Item {} not found for user {}", item_id, user_id)
            }
            ServiceError::Scheduler(err) => write!(f, "{}", err),
            ServiceError::Store(err) => write!(f, "{}", err),
            ServiceError::RetriesExhausted { item_id, attempts } => write!(
                f,
                "Item {} kept changing; gave up after {} attempts",
                item_id, attempts
            ),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServiceError::Scheduler(err) => Some(err),
            ServiceError::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SchedulerError> for ServiceError {
    fn from(err: SchedulerError) -> Self {
        ServiceError::Scheduler(err)
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { user_id, item_id } => ServiceError::NotFound { user_id, item_id },
            other => ServiceError::Store(other),
        }
    }
}

/// Apply `grade` to one item and persist it with its review log.
///
/// Scheduler errors are returned immediately; only version conflicts retry.
pub fn submit_grade<S: ItemStore + ?Sized>(
    store: &S,
    config: &SchedulerConfig,
    user_id: i64,
    item_id: i64,
    grade: Grade,
    now: DateTime<Utc>,
) -> Result<ReviewItem, ServiceError> {
    for attempt in 1..=MAX_CONFLICT_RETRIES {
        let item = store
            .load_item(user_id, item_id)?
            .ok_or(ServiceError::NotFound { user_id, item_id })?;

        let next = apply_grade(&item, grade, now, config)?;
        let log = ReviewLog::for_transition(&item, &next, grade);

        match store.save_item(&next, item.version, &log) {
            Ok(saved) => {
                tracing::info!(
                    user_id,
                    item_id,
                    grade = grade.as_str(),
                    from = item.state.as_str(),
                    to = saved.state.as_str(),
                    "Review recorded"
                );
                return Ok(saved);
            }
            Err(StoreError::Conflict { .. }) => {
                tracing::warn!(
                    user_id,
                    item_id,
                    attempt,
                    "Concurrent update detected, retrying review"
                );
            }
            Err(err) => return Err(err.into()),
        }
    }

    tracing::error!(user_id, item_id, "Review abandoned after repeated conflicts");
    Err(ServiceError::RetriesExhausted {
        item_id,
        attempts: MAX_CONFLICT_RETRIES,
    })
}

pub fn load_queue<S: ItemStore + ?Sized>(
    store: &S,
    user_id: i64,
    now: DateTime<Utc>,
    max_new_per_day: u32,
    extra_new: Option<i64>,
    show_all: bool,
) -> Result<(Vec<ReviewItem>, QueueStats), ServiceError> {
    let items = store.load_all_items(user_id)?;
    Ok(build_queue(&items, now, max_new_per_day, extra_new, show_all))
}
