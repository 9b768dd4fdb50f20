//! Test utilities for database setup.
//!
//! Reuses the production schema so tests never carry their own copy of it.

use rusqlite::Connection;
use std::sync::MutexGuard;
use tempfile::TempDir;

use crate::db::{self, DbPool, SqliteStore, StoreError};

/// A migrated database file in a temporary directory, removed on drop.
pub struct TestEnv {
    /// Kept alive for database file persistence
    pub temp: TempDir,
    pub pool: DbPool,
    pub store: SqliteStore,
}

impl TestEnv {
    pub fn new() -> rusqlite::Result<Self> {
        let temp =
            TempDir::new().map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
        let pool = db::init_db(&temp.path().join("flashdeck.db"))?;
        let store = SqliteStore::new(pool.clone());
        Ok(Self { temp, pool, store })
    }

    /// Raw connection for seeding or corrupting rows directly
    pub fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        db::try_lock(&self.pool)
    }
}
