//! Embedded schema migrations.
//!
//! `sqlx::migrate!` compiles every file under `migrations/sqlite/` into the
//! binary; applied versions are tracked in `_sqlx_migrations`, so running the
//! migrator twice is a no-op. New schema changes get a new `NNN_name.sql`
//! file - existing migration files are never edited.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies any migrations the database has not seen yet, in filename order,
/// each in its own transaction.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    MIGRATOR.run(pool).await?;
    info!(
        embedded = MIGRATOR.migrations.len(),
        "Schema migrations up to date"
    );
    Ok(())
}

/// `(embedded, applied)` migration counts, for diagnostics.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await
        .unwrap_or(0);

    Ok((MIGRATOR.migrations.len(), applied as usize))
}
