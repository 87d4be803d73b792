//! Database layer for the Portal backend.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode initialization,
//! and a filesystem-driven SQL migration runner. Every table in Portal is
//! created through versioned `.sql` files applied by this crate.
//!
//! # Design decisions
//!
//! - **SQLite with WAL mode**: no external database process required. WAL
//!   allows concurrent readers with a single writer, which matches the
//!   Portal access pattern.
//! - **`r2d2` connection pool**: bounded connection reuse without manual
//!   lifetime management.
//! - **Migrations on disk**: SQL files live in a migrations directory and
//!   are applied at startup (or via `portal-migrate`), tracked in the
//!   `schema_migrations` ledger so each file runs exactly once.

mod ledger;
mod pool;
mod runner;
mod store;

pub use ledger::{ensure_ledger, is_applied, list_applied, mark_applied, LedgerError};
pub use pool::{create_pool, DbPool, PoolError, PoolSettings};
pub use runner::{run_migrations, MigrationError};
pub use store::{discover_migrations, DiscoveryError, MigrationScript};
