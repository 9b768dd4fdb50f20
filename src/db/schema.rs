use rusqlite::{Connection, Result};

pub fn run_migrations(conn: &Connection) -> Result<()> {
  conn.execute_batch(
    r#"
    CREATE TABLE IF NOT EXISTS review_items (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      user_id INTEGER NOT NULL,
      card_id INTEGER NOT NULL,
      direction TEXT NOT NULL,
      state TEXT NOT NULL DEFAULT 'New',
      interval_days REAL NOT NULL DEFAULT 0,
      ease_factor REAL NOT NULL DEFAULT 2.5,
      repetitions INTEGER NOT NULL DEFAULT 0,
      step_index INTEGER NOT NULL DEFAULT 0,
      due_date TEXT NOT NULL,
      last_reviewed TEXT,
      introduced_at TEXT,
      -- optimistic concurrency token, bumped on every write
      version INTEGER NOT NULL DEFAULT 0,
      UNIQUE (user_id, card_id, direction)
    );

    CREATE TABLE IF NOT EXISTS review_logs (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      item_id INTEGER NOT NULL,
      user_id INTEGER NOT NULL,
      grade TEXT NOT NULL,
      prior_state TEXT NOT NULL,
      new_state TEXT NOT NULL,
      reviewed_at TEXT NOT NULL,
      FOREIGN KEY (item_id) REFERENCES review_items(id)
    );

    -- Indexes
    CREATE INDEX IF NOT EXISTS idx_review_items_user ON review_items(user_id);
    CREATE INDEX IF NOT EXISTS idx_review_items_due ON review_items(user_id, due_date);
    CREATE INDEX IF NOT EXISTS idx_review_logs_user_reviewed_at ON review_logs(user_id, reviewed_at);
    CREATE INDEX IF NOT EXISTS idx_review_logs_item_id ON review_logs(item_id);
    "#,
  )?;

  Ok(())
}
