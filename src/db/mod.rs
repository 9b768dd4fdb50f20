pub mod history;
pub mod items;
pub mod schema;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, Result};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::SchedulerConfig;
use crate::domain::{ReviewItem, ReviewLog};
use crate::srs::SchedulerError;

pub use items::SqliteStore;
pub use schema::run_migrations;

pub type DbPool = Arc<Mutex<Connection>>;

/// Storage collaborator used by the services and handlers.
///
/// Writes are conditional on the item's `version`, so two grade submissions
/// racing on one item cannot silently overwrite each other.
pub trait ItemStore: Send + Sync {
    /// Full item set for queue building
    fn load_all_items(&self, user_id: i64) -> std::result::Result<Vec<ReviewItem>, StoreError>;

    fn load_item(
        &self,
        user_id: i64,
        item_id: i64,
    ) -> std::result::Result<Option<ReviewItem>, StoreError>;

    /// Persist `item` only if the stored version still equals
    /// `expected_version`, appending `log` in the same transaction.
    /// Returns the stored item carrying its new version.
    fn save_item(
        &self,
        item: &ReviewItem,
        expected_version: i64,
        log: &ReviewLog,
    ) -> std::result::Result<ReviewItem, StoreError>;

    /// Administrative reset: drop today's review history for a user.
    /// Returns the number of review log rows removed.
    fn delete_todays_history(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> std::result::Result<usize, StoreError>;

    /// Create the New items of a freshly created card, one per direction.
    /// Existing items for the card are returned untouched.
    fn create_items_for_card(
        &self,
        user_id: i64,
        card_id: i64,
        now: DateTime<Utc>,
        config: &SchedulerConfig,
    ) -> std::result::Result<Vec<ReviewItem>, StoreError>;
}

/// Storage failures
#[derive(Debug)]
pub enum StoreError {
    /// The item changed since it was read; re-read, recompute, retry
    Conflict { item_id: i64, expected_version: i64 },
    NotFound { user_id: i64, item_id: i64 },
    /// Persisted row does not decode into a valid item
    InvalidData(SchedulerError),
    LockPoisoned,
    Database(rusqlite::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Conflict {
                item_id,
                expected_version,
            } => write!(
                f,
                "Item {} was modified concurrently (expected version {})",
                item_id, expected_version
            ),
            StoreError::NotFound { user_id, item_id } => {
                write!(f, "Item {} not found for user {}", item_id, user_id)
            }
            StoreError::InvalidData(err) => write!(f, "Corrupted item data: {}", err),
            StoreError::LockPoisoned => write!(f, "Database unavailable"),
            StoreError::Database(err) => write!(f, "Database error: {}", err),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::InvalidData(err) => Some(err),
            StoreError::Database(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(err)
    }
}

impl From<SchedulerError> for StoreError {
    fn from(err: SchedulerError) -> Self {
        StoreError::InvalidData(err)
    }
}

/// Extension trait for logging errors before discarding them
pub trait LogOnError<T> {
    /// Log the error at warn level and return None
    fn log_warn(self, context: &str) -> Option<T>;
}

impl<T, E: std::fmt::Display> LogOnError<T> for std::result::Result<T, E> {
    fn log_warn(self, context: &str) -> Option<T> {
        match self {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("{}: {}", context, e);
                None
            }
        }
    }
}

/// Try to acquire the database lock, returning an error if poisoned
pub fn try_lock(pool: &DbPool) -> std::result::Result<MutexGuard<'_, Connection>, StoreError> {
    pool.lock().map_err(|_: PoisonError<_>| {
        tracing::error!("Database mutex poisoned - a thread panicked while holding the lock");
        StoreError::LockPoisoned
    })
}

pub fn init_db(path: &Path) -> Result<DbPool> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .log_warn("Could not create database directory");
    }

    // Create backup before migrations if database exists
    if path.exists() {
        let backup_path = path.with_extension("db.backup");
        std::fs::copy(path, &backup_path).log_warn("Could not create database backup");
    }

    let conn = Connection::open(path)?;
    run_migrations(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

/// Fixed-width UTC timestamps so text comparison matches time order
pub(crate) fn to_db_time(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn from_db_time(
    column: &str,
    value: &str,
) -> std::result::Result<DateTime<Utc>, SchedulerError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SchedulerError::InvalidState(format!("bad {} '{}': {}", column, value, e)))
}
