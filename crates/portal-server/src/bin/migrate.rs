//! One-shot migration command.
//!
//! Applies all pending migrations from the configured directory and exits:
//! 0 on success, 1 on the first failure, with the offending file and error
//! printed to standard error. Intended for deploy pipelines; the server
//! binary also runs migrations at startup, so this is the standalone form.

use std::path::Path;

use portal_server::config;
use tracing_subscriber::EnvFilter;

fn main() {
    let (resolved_config_path, config_source) = config::resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));

    let config = match config::load_config(selected_config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!(
        source = config_source,
        database = %config.database.path,
        migrations_dir = %config.database.migrations_dir,
        "running pending migrations"
    );

    let pool = match portal_db::create_pool(
        &config.database.path,
        portal_db::PoolSettings {
            busy_timeout_ms: config.database.busy_timeout_ms,
            max_connections: 1,
        },
    ) {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("failed to open database '{}': {e}", config.database.path);
            std::process::exit(1);
        }
    };

    let conn = match pool.get() {
        Ok(conn) => conn,
        Err(e) => {
            eprintln!("failed to get database connection: {e}");
            std::process::exit(1);
        }
    };

    match portal_db::run_migrations(&conn, Path::new(&config.database.migrations_dir)) {
        Ok(0) => tracing::info!("all migrations are up to date"),
        Ok(applied) => tracing::info!(count = applied, "applied database migrations"),
        Err(e) => {
            eprintln!("migration failed: {e}");
            std::process::exit(1);
        }
    }
}
