//! Database schema definitions and migrations.
//!
//! The PostgreSQL schema lives in `migrations/` and is embedded into the
//! binary at compile time.

use sqlx::migrate::Migrator;
use sqlx::PgPool;

use crate::error::{Result, StoreError};

/// Embedded schema migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Apply pending migrations.
///
/// # Errors
///
/// Returns an error if a migration fails to apply.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .map_err(|e| StoreError::Database(format!("migration failed: {e}")))?;
    tracing::info!(
        migrations = MIGRATOR.iter().count(),
        latest_version = ?MIGRATOR.iter().map(|m| m.version).max(),
        "Database schema is up to date"
    );
    Ok(())
}
