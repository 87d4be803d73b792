//! Applied-migration ledger.
//!
//! The `schema_migrations` table records which migration files have been
//! applied and when. The table is self-bootstrapping: the first migration
//! carries its canonical definition, but the runner needs it to exist before
//! it can ask what has been applied, so [`ensure_ledger`] creates it with
//! idempotent DDL on a pristine database.

use rusqlite::Connection;
use thiserror::Error;

/// A ledger read or write failed.
#[derive(Debug, Error)]
#[error("ledger read/write failed: {0}")]
pub struct LedgerError(#[from] rusqlite::Error);

/// Creates the `schema_migrations` table if it does not exist.
pub fn ensure_ledger(conn: &Connection) -> Result<(), LedgerError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            migration_file TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;
    Ok(())
}

/// Returns true if a ledger record exists for `filename`.
pub fn is_applied(conn: &Connection, filename: &str) -> Result<bool, LedgerError> {
    let applied = conn.query_row(
        "SELECT COUNT(*) > 0 FROM schema_migrations WHERE migration_file = ?1",
        [filename],
        |row| row.get(0),
    )?;
    Ok(applied)
}

/// Records `filename` as applied.
///
/// Inserting an already-present filename is a no-op, so two runners racing
/// on the same file observe the uniqueness constraint as "already applied"
/// rather than as an error.
pub fn mark_applied(conn: &Connection, filename: &str) -> Result<(), LedgerError> {
    conn.execute(
        "INSERT OR IGNORE INTO schema_migrations (migration_file) VALUES (?1)",
        [filename],
    )?;
    Ok(())
}

/// Lists all applied filenames in insertion order.
pub fn list_applied(conn: &Connection) -> Result<Vec<String>, LedgerError> {
    let mut stmt = conn.prepare("SELECT migration_file FROM schema_migrations ORDER BY id")?;
    let rows = stmt.query_map([], |row| row.get(0))?;
    let mut applied = Vec::new();
    for row in rows {
        applied.push(row?);
    }
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_conn() -> Connection {
        let conn = Connection::open_in_memory().expect("should open in-memory db");
        ensure_ledger(&conn).expect("ledger bootstrap should succeed");
        conn
    }

    #[test]
    fn ensure_ledger_is_idempotent() {
        let conn = fresh_conn();
        ensure_ledger(&conn).expect("second bootstrap should succeed");
    }

    #[test]
    fn mark_and_query_round_trip() {
        let conn = fresh_conn();

        assert!(!is_applied(&conn, "001_initial_schema.sql").expect("query should succeed"));
        mark_applied(&conn, "001_initial_schema.sql").expect("insert should succeed");
        assert!(is_applied(&conn, "001_initial_schema.sql").expect("query should succeed"));
    }

    #[test]
    fn mark_applied_twice_is_a_no_op() {
        let conn = fresh_conn();

        mark_applied(&conn, "001_initial_schema.sql").expect("first insert should succeed");
        mark_applied(&conn, "001_initial_schema.sql").expect("duplicate insert should be ignored");

        let applied = list_applied(&conn).expect("list should succeed");
        assert_eq!(applied, vec!["001_initial_schema.sql".to_string()]);
    }

    #[test]
    fn list_applied_preserves_insertion_order() {
        let conn = fresh_conn();

        mark_applied(&conn, "001_a.sql").expect("insert should succeed");
        mark_applied(&conn, "002_b.sql").expect("insert should succeed");
        mark_applied(&conn, "003_c.sql").expect("insert should succeed");

        let applied = list_applied(&conn).expect("list should succeed");
        assert_eq!(applied, vec!["001_a.sql", "002_b.sql", "003_c.sql"]);
    }

    #[test]
    fn missing_table_surfaces_ledger_error() {
        let conn = Connection::open_in_memory().expect("should open in-memory db");
        assert!(is_applied(&conn, "001_a.sql").is_err());
    }
}
