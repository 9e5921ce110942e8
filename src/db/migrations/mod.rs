//! Schema upgrades.
//!
//! `migration_NN_up.sql` brings the schema from version `NN-1` to `NN`. Upgrades only go forward;
//! a database written by a newer build is refused rather than rolled back.

use anyhow::{ensure, Context};
use sqlx::{Executor, SqlitePool};
use tracing::debug;

use crate::error::Res;

/// The schema version this build of the application expects.
pub(crate) const CURRENT_VERSION: i32 = 1;

/// Upgrade SQL in order. Entry `i` brings the schema to version `i + 1`.
const UPGRADES: &[&str] = &[include_str!("migration_01_up.sql")];

/// Brings the schema from version `from` to `CURRENT_VERSION`, one version per transaction.
pub(crate) async fn upgrade(pool: &SqlitePool, from: i32) -> Res<()> {
    ensure!(
        (0..=CURRENT_VERSION).contains(&from),
        "Cannot upgrade the database schema from version {from}, this program supports up to \
        version {CURRENT_VERSION}"
    );
    if from == CURRENT_VERSION {
        debug!("Database schema is at version {from}, nothing to upgrade");
        return Ok(());
    }
    for version in (from + 1)..=CURRENT_VERSION {
        let sql = UPGRADES
            .get((version - 1) as usize)
            .with_context(|| format!("No upgrade to schema version {version}"))?;
        debug!("Upgrading database schema to version {version:02}");
        apply(pool, sql, version).await?;
    }
    Ok(())
}

async fn apply(pool: &SqlitePool, sql: &str, version: i32) -> Res<()> {
    let mut tx = pool
        .begin()
        .await
        .context("Failed to begin schema upgrade")?;
    tx.execute(sql)
        .await
        .with_context(|| format!("Failed to execute the upgrade to schema version {version}"))?;
    sqlx::query("UPDATE schema_version SET version = ?")
        .bind(version)
        .execute(&mut *tx)
        .await
        .context("Failed to update schema_version")?;
    tx.commit()
        .await
        .context("Failed to commit schema upgrade")?;
    Ok(())
}
