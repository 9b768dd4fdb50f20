//! SQLite-backed item store

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::history::{delete_logs_since, insert_review_log};
use super::{from_db_time, to_db_time, try_lock, DbPool, ItemStore, StoreError};
use crate::config::SchedulerConfig;
use crate::domain::{Direction, ItemState, ReviewItem, ReviewLog};
use crate::srs::{start_of_day, SchedulerError};

const ITEM_COLUMNS: &str = "id, user_id, card_id, direction, state, interval_days, ease_factor, \
                            repetitions, step_index, due_date, last_reviewed, introduced_at, version";

#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl ItemStore for SqliteStore {
    fn load_all_items(&self, user_id: i64) -> Result<Vec<ReviewItem>, StoreError> {
        let conn = try_lock(&self.pool)?;
        get_items_for_user(&conn, user_id)
    }

    fn load_item(&self, user_id: i64, item_id: i64) -> Result<Option<ReviewItem>, StoreError> {
        let conn = try_lock(&self.pool)?;
        get_item(&conn, user_id, item_id)
    }

    fn save_item(
        &self,
        item: &ReviewItem,
        expected_version: i64,
        log: &ReviewLog,
    ) -> Result<ReviewItem, StoreError> {
        let mut conn = try_lock(&self.pool)?;
        let tx = conn.transaction()?;

        let updated = update_item_if_version(&tx, item, expected_version)?;
        if updated == 0 {
            let exists = get_item(&tx, item.user_id, item.id)?.is_some();
            return Err(if exists {
                StoreError::Conflict {
                    item_id: item.id,
                    expected_version,
                }
            } else {
                StoreError::NotFound {
                    user_id: item.user_id,
                    item_id: item.id,
                }
            });
        }
        insert_review_log(&tx, log)?;
        let stored = get_item(&tx, item.user_id, item.id)?.ok_or(StoreError::NotFound {
            user_id: item.user_id,
            item_id: item.id,
        })?;
        tx.commit()?;
        Ok(stored)
    }

    fn delete_todays_history(&self, user_id: i64, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut conn = try_lock(&self.pool)?;
        let tx = conn.transaction()?;
        let since = start_of_day(now);

        let deleted = delete_logs_since(&tx, user_id, since)?;
        let forgotten = clear_introductions_since(&tx, user_id, since)?;
        tx.commit()?;

        tracing::info!(
            user_id,
            deleted,
            forgotten,
            "Deleted today's review history"
        );
        Ok(deleted)
    }

    fn create_items_for_card(
        &self,
        user_id: i64,
        card_id: i64,
        now: DateTime<Utc>,
        config: &SchedulerConfig,
    ) -> Result<Vec<ReviewItem>, StoreError> {
        let mut conn = try_lock(&self.pool)?;
        let tx = conn.transaction()?;

        for direction in Direction::both() {
            let item = ReviewItem::new(0, user_id, card_id, direction, now, config);
            insert_item_if_missing(&tx, &item)?;
        }
        let items = get_items_for_card(&tx, user_id, card_id)?;
        tx.commit()?;
        Ok(items)
    }
}

/// Insert a New item; a no-op when the (user, card, direction) exists
pub fn insert_item_if_missing(conn: &Connection, item: &ReviewItem) -> Result<bool, StoreError> {
    let inserted = conn.execute(
        r#"
    INSERT OR IGNORE INTO review_items (user_id, card_id, direction, state, interval_days,
                                        ease_factor, repetitions, step_index, due_date,
                                        last_reviewed, introduced_at, version)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
    "#,
        params![
            item.user_id,
            item.card_id,
            item.direction.as_str(),
            item.state.as_str(),
            item.interval,
            item.ease_factor,
            item.repetitions,
            item.step_index as i64,
            to_db_time(item.due_date),
            item.last_reviewed.map(to_db_time),
            item.introduced_at.map(to_db_time),
            item.version,
        ],
    )?;
    Ok(inserted > 0)
}

pub fn get_item(
    conn: &Connection,
    user_id: i64,
    item_id: i64,
) -> Result<Option<ReviewItem>, StoreError> {
    let query = format!(
        "SELECT {} FROM review_items WHERE id = ?1 AND user_id = ?2",
        ITEM_COLUMNS
    );
    let row = conn
        .query_row(&query, params![item_id, user_id], read_item_row)
        .optional()?;
    row.map(ItemRow::into_item).transpose()
}

pub fn get_items_for_user(conn: &Connection, user_id: i64) -> Result<Vec<ReviewItem>, StoreError> {
    let query = format!(
        "SELECT {} FROM review_items WHERE user_id = ?1 ORDER BY id ASC",
        ITEM_COLUMNS
    );
    let mut stmt = conn.prepare(&query)?;
    let rows = stmt
        .query_map(params![user_id], read_item_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(ItemRow::into_item).collect()
}

pub fn get_items_for_card(
    conn: &Connection,
    user_id: i64,
    card_id: i64,
) -> Result<Vec<ReviewItem>, StoreError> {
    let query = format!(
        "SELECT {} FROM review_items WHERE user_id = ?1 AND card_id = ?2 ORDER BY id ASC",
        ITEM_COLUMNS
    );
    let mut stmt = conn.prepare(&query)?;
    let rows = stmt
        .query_map(params![user_id, card_id], read_item_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(ItemRow::into_item).collect()
}

/// Conditional write; returns the number of rows touched (0 on a stale version)
fn update_item_if_version(
    conn: &Connection,
    item: &ReviewItem,
    expected_version: i64,
) -> Result<usize, StoreError> {
    let updated = conn.execute(
        r#"
    UPDATE review_items
    SET state = ?1, interval_days = ?2, ease_factor = ?3, repetitions = ?4, step_index = ?5,
        due_date = ?6, last_reviewed = ?7, introduced_at = ?8, version = version + 1
    WHERE id = ?9 AND user_id = ?10 AND version = ?11
    "#,
        params![
            item.state.as_str(),
            item.interval,
            item.ease_factor,
            item.repetitions,
            item.step_index as i64,
            to_db_time(item.due_date),
            item.last_reviewed.map(to_db_time),
            item.introduced_at.map(to_db_time),
            item.id,
            item.user_id,
            expected_version,
        ],
    )?;
    Ok(updated)
}

/// Forget introductions made since `since`; bumps the version so in-flight
/// grade submissions on those items conflict instead of restoring them.
fn clear_introductions_since(
    conn: &Connection,
    user_id: i64,
    since: DateTime<Utc>,
) -> Result<usize, StoreError> {
    let cleared = conn.execute(
        r#"
    UPDATE review_items
    SET introduced_at = NULL, version = version + 1
    WHERE user_id = ?1 AND introduced_at >= ?2
    "#,
        params![user_id, to_db_time(since)],
    )?;
    Ok(cleared)
}

/// Raw column values, decoded into a `ReviewItem` outside the row callback
struct ItemRow {
    id: i64,
    user_id: i64,
    card_id: i64,
    direction: String,
    state: String,
    interval: f64,
    ease_factor: f64,
    repetitions: i64,
    step_index: i64,
    due_date: String,
    last_reviewed: Option<String>,
    introduced_at: Option<String>,
    version: i64,
}

fn read_item_row(row: &rusqlite::Row) -> rusqlite::Result<ItemRow> {
    Ok(ItemRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        card_id: row.get(2)?,
        direction: row.get(3)?,
        state: row.get(4)?,
        interval: row.get(5)?,
        ease_factor: row.get(6)?,
        repetitions: row.get(7)?,
        step_index: row.get(8)?,
        due_date: row.get(9)?,
        last_reviewed: row.get(10)?,
        introduced_at: row.get(11)?,
        version: row.get(12)?,
    })
}

impl ItemRow {
    fn into_item(self) -> Result<ReviewItem, StoreError> {
        let invalid = |what: String| StoreError::InvalidData(SchedulerError::InvalidState(what));

        let direction = Direction::from_str(&self.direction).ok_or_else(|| {
            invalid(format!("item {} has unknown direction '{}'", self.id, self.direction))
        })?;
        let state = ItemState::from_str(&self.state)?;
        let repetitions = u32::try_from(self.repetitions)
            .map_err(|_| invalid(format!("item {} has repetitions {}", self.id, self.repetitions)))?;
        let step_index = usize::try_from(self.step_index)
            .map_err(|_| invalid(format!("item {} has step index {}", self.id, self.step_index)))?;

        Ok(ReviewItem {
            id: self.id,
            user_id: self.user_id,
            card_id: self.card_id,
            direction,
            state,
            interval: self.interval,
            ease_factor: self.ease_factor,
            repetitions,
            step_index,
            due_date: from_db_time("due_date", &self.due_date)?,
            last_reviewed: self
                .last_reviewed
                .as_deref()
                .map(|s| from_db_time("last_reviewed", s))
                .transpose()?,
            introduced_at: self
                .introduced_at
                .as_deref()
                .map(|s| from_db_time("introduced_at", s))
                .transpose()?,
            version: self.version,
        })
    }
}
