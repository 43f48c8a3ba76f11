pub mod ledger;
pub mod migrations;
pub mod models;
pub mod queries;

use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

/// SQLite handle shared by every request handler.
///
/// A single connection behind a mutex: every statement runs to completion
/// before the next starts, and counter updates are expressed as
/// `SET col = col + ?` so they never depend on a previously read value.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent readers from other processes (backups, sqlite3 shell)
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::init(conn, &path.display().to_string())
    }

    /// Private in-memory database, used by tests and local experiments.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?, ":memory:")
    }

    fn init(conn: Connection, label: &str) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;

        migrations::run(&conn)?;

        info!("Database opened at {}", label);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
        f(&conn)
    }

    pub fn health_check(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_go_through_the_shared_connection() {
        let db = Database::open_in_memory().unwrap();
        db.health_check().unwrap();

        db.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute_batch("CREATE TABLE scratch (n INTEGER); INSERT INTO scratch VALUES (7);")?;
            tx.commit()?;
            Ok(())
        })
        .unwrap();
        let n: i64 = db
            .with_conn(|conn| Ok(conn.query_row("SELECT n FROM scratch", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(n, 7);
    }
}
