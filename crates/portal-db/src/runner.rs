//! Migration runner.
//!
//! Applies pending migration scripts in sequence order, exactly once each,
//! recording every applied file in the `schema_migrations` ledger. Each
//! script's statements and its ledger insert commit in a single transaction.
//! The run stops at the first failure; scripts before the failed one stay
//! applied, the failed one and everything after it do not run.

use std::path::Path;

use rusqlite::Connection;
use thiserror::Error;

use crate::ledger::{self, LedgerError};
use crate::store::{self, DiscoveryError};

/// Errors that can occur during a migration run.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// The file store could not be enumerated or read.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// The ledger could not be read or written.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// A migration's SQL failed to apply.
    #[error("migration '{filename}' failed: {source}")]
    Execution {
        /// The file whose SQL failed.
        filename: String,
        /// The underlying SQLite error.
        source: rusqlite::Error,
    },
}

/// Applies all pending migrations from `dir` against `conn`.
///
/// Returns the number of migrations applied by this run. Scripts already
/// recorded in the ledger are skipped.
///
/// # Errors
///
/// Returns [`MigrationError`] on the first script that fails; earlier
/// scripts remain committed and later ones are not attempted.
pub fn run_migrations(conn: &Connection, dir: &Path) -> Result<usize, MigrationError> {
    // The ledger must exist before we can ask what has been applied. On a
    // pristine database the first migration has not created it yet.
    ledger::ensure_ledger(conn)?;

    let scripts = store::discover_migrations(dir)?;

    let mut applied = 0;
    for script in &scripts {
        if ledger::is_applied(conn, &script.filename)? {
            tracing::debug!(
                migration = %script.filename,
                "migration already applied, skipping"
            );
            continue;
        }

        let sql = script.read_sql()?;

        tracing::info!(migration = %script.filename, "applying migration");

        let tx = conn
            .unchecked_transaction()
            .map_err(|e| MigrationError::Execution {
                filename: script.filename.clone(),
                source: e,
            })?;

        tx.execute_batch(&sql).map_err(|e| MigrationError::Execution {
            filename: script.filename.clone(),
            source: e,
        })?;

        ledger::mark_applied(&tx, &script.filename)?;

        tx.commit().map_err(|e| MigrationError::Execution {
            filename: script.filename.clone(),
            source: e,
        })?;

        applied += 1;
    }

    Ok(applied)
}
