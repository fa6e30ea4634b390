use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::error::Result;

/// Connection wrapper owning the schema. All store queries are methods on
/// this type; mutation entry points in the engine hold an
/// `unchecked_transaction` on the same connection, so store calls made
/// while the transaction is open participate in it.
pub struct Db {
    conn: Connection,
}

impl Db {
    /// Open (or create) the database at the given file path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;\
             PRAGMA foreign_keys=ON;\
             PRAGMA busy_timeout=5000;",
        )?;
        let db = Self { conn };
        db.create_tables()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(
            "PRAGMA foreign_keys=ON;\
             PRAGMA busy_timeout=5000;",
        )?;
        let db = Self { conn };
        db.create_tables()?;
        Ok(db)
    }

    fn create_tables(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS work_items (
                work_item_id TEXT PRIMARY KEY,
                parent_work_item_id TEXT REFERENCES work_items(work_item_id),
                name TEXT NOT NULL,
                description TEXT,
                status TEXT NOT NULL DEFAULT 'todo',
                priority TEXT NOT NULL DEFAULT 'medium',
                due_date TEXT,
                order_key TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_work_items_parent
                ON work_items(parent_work_item_id);
            CREATE INDEX IF NOT EXISTS idx_work_items_active_status
                ON work_items(is_active, status);

            CREATE TABLE IF NOT EXISTS work_item_dependencies (
                work_item_id TEXT NOT NULL REFERENCES work_items(work_item_id),
                depends_on_work_item_id TEXT NOT NULL REFERENCES work_items(work_item_id),
                dependency_type TEXT NOT NULL DEFAULT 'finish-to-start',
                is_active INTEGER NOT NULL DEFAULT 1,
                PRIMARY KEY (work_item_id, depends_on_work_item_id)
            );
            CREATE INDEX IF NOT EXISTS idx_dependencies_item
                ON work_item_dependencies(work_item_id);
            CREATE INDEX IF NOT EXISTS idx_dependencies_target
                ON work_item_dependencies(depends_on_work_item_id);

            CREATE TABLE IF NOT EXISTS action_history (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                action_id TEXT NOT NULL UNIQUE,
                work_item_id TEXT,
                action_type TEXT NOT NULL,
                description TEXT NOT NULL,
                is_undone INTEGER NOT NULL DEFAULT 0,
                undone_at_action_id TEXT,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_action_history_created
                ON action_history(created_at);

            CREATE TABLE IF NOT EXISTS undo_steps (
                action_id TEXT NOT NULL REFERENCES action_history(action_id),
                step_order INTEGER NOT NULL,
                step_type TEXT NOT NULL,
                table_name TEXT NOT NULL,
                record_id TEXT NOT NULL,
                old_data TEXT,
                new_data TEXT,
                PRIMARY KEY (action_id, step_order)
            );",
        )?;
        Ok(())
    }

    /// Expose the raw connection (transactions, tests).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

/// Parse an RFC 3339 timestamp from a SQLite TEXT column, tolerating
/// malformed data by falling back to now.
pub(crate) fn parse_dt(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

pub(crate) fn parse_dt_opt(s: Option<String>) -> Option<DateTime<Utc>> {
    s.map(|v| parse_dt(&v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_memory_creates_schema() {
        let db = Db::open_memory().unwrap();
        let count: i64 = db
            .conn()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                 AND name IN ('work_items', 'work_item_dependencies', 'action_history', 'undo_steps')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 4);
    }

    #[test]
    fn parse_dt_round_trips() {
        let now = Utc::now();
        let parsed = parse_dt(&crate::model::fmt_dt(now));
        assert!((parsed - now).num_microseconds().unwrap().abs() < 2);
    }
}
