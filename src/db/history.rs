//! Review history

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::{from_db_time, to_db_time, StoreError};
use crate::domain::{Grade, ItemState, ReviewLog};

pub fn insert_review_log(conn: &Connection, log: &ReviewLog) -> Result<i64, StoreError> {
    conn.execute(
        r#"
    INSERT INTO review_logs (item_id, user_id, grade, prior_state, new_state, reviewed_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
    "#,
        params![
            log.item_id,
            log.user_id,
            log.grade.as_str(),
            log.prior_state.as_str(),
            log.new_state.as_str(),
            to_db_time(log.reviewed_at),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// All review logs for a user, oldest first
pub fn get_review_logs(conn: &Connection, user_id: i64) -> Result<Vec<ReviewLog>, StoreError> {
    let mut stmt = conn.prepare(
        r#"
    SELECT id, item_id, user_id, grade, prior_state, new_state, reviewed_at
    FROM review_logs
    WHERE user_id = ?1
    ORDER BY reviewed_at ASC, id ASC
    "#,
    )?;

    let rows = stmt
        .query_map(params![user_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    rows.into_iter().map(decode_log).collect()
}

type LogRow = (i64, i64, i64, String, String, String, String);

fn decode_log(row: LogRow) -> Result<ReviewLog, StoreError> {
    let (id, item_id, user_id, grade, prior, new, reviewed_at) = row;
    Ok(ReviewLog {
        id,
        item_id,
        user_id,
        grade: grade.parse::<Grade>()?,
        prior_state: ItemState::from_str(&prior)?,
        new_state: ItemState::from_str(&new)?,
        reviewed_at: from_db_time("reviewed_at", &reviewed_at)?,
    })
}

pub fn delete_logs_since(
    conn: &Connection,
    user_id: i64,
    since: DateTime<Utc>,
) -> Result<usize, StoreError> {
    let deleted = conn.execute(
        "DELETE FROM review_logs WHERE user_id = ?1 AND reviewed_at >= ?2",
        params![user_id, to_db_time(since)],
    )?;
    Ok(deleted)
}
