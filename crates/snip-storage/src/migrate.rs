//! Versioned schema migrations for the SQLite backend.
//!
//! The schema version lives in the database itself, in `PRAGMA
//! user_version` (0 for a fresh store). Each migration runs in its own
//! transaction that also bumps the version counter, so a store is brought
//! from any prior version to the latest exactly once per step.

use snip_core::{Result, StoreError};
use sqlx::SqlitePool;

pub(crate) struct Migration {
    pub name: &'static str,
    pub sql: &'static str,
}

const CREATE_USERS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS users (
    username TEXT PRIMARY KEY NOT NULL,
    email TEXT,
    password TEXT,
    role INTEGER NOT NULL DEFAULT 0
)
";

const CREATE_LINKS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS links (
    short TEXT PRIMARY KEY NOT NULL,
    original TEXT,
    owner TEXT REFERENCES users(username),
    date_created TEXT,
    date_expired TEXT
)
";

/// Ordered schema history. Statements are idempotent (`IF NOT EXISTS`) so
/// a step interrupted between its DDL and the version bump can be retried
/// safely on the next open.
pub(crate) const MIGRATIONS: &[Migration] = &[
    Migration {
        name: "create users table",
        sql: CREATE_USERS_TABLE,
    },
    Migration {
        name: "create links table",
        sql: CREATE_LINKS_TABLE,
    },
];

/// The schema version a fully migrated store reports.
pub fn latest_version() -> i64 {
    MIGRATIONS.len() as i64
}

/// Reads the store's persisted schema version.
pub async fn schema_version(pool: &SqlitePool) -> Result<i64> {
    sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(pool)
        .await
        .map_err(|e| StoreError::Unavailable(format!("failed to read schema version: {e}")))
}

/// Applies every migration the store has not seen yet, in ascending order,
/// one transaction per step. A store already at or above the latest
/// version is a no-op. The first failing step rolls back and aborts the
/// run; later steps are not attempted.
pub async fn apply_migrations(pool: &SqlitePool) -> Result<()> {
    let current = schema_version(pool).await?;
    let required = latest_version();
    tracing::info!(current, required, "checking schema version");

    for index in current..required {
        let migration = &MIGRATIONS[index as usize];
        apply_step(pool, migration, index + 1).await?;
    }

    Ok(())
}

async fn apply_step(pool: &SqlitePool, migration: &Migration, version: i64) -> Result<()> {
    tracing::info!(version, name = migration.name, "applying migration");

    let failed = |e: sqlx::Error| {
        StoreError::Unavailable(format!(
            "migration {version} '{}' failed: {e}",
            migration.name
        ))
    };

    // Dropping the transaction without committing rolls it back.
    let mut tx = pool.begin().await.map_err(failed)?;
    sqlx::query(migration.sql)
        .execute(&mut *tx)
        .await
        .map_err(failed)?;
    // PRAGMA does not accept bound parameters.
    sqlx::query(&format!("PRAGMA user_version = {version}"))
        .execute(&mut *tx)
        .await
        .map_err(failed)?;
    tx.commit().await.map_err(failed)
}
