//! Schema migrations for the ledger database.
//!
//! Each schema version `NN` has two files next to this module:
//! - `migration_NN_up.sql` moves the schema from `NN-1` to `NN`
//! - `migration_NN_down.sql` moves it back from `NN` to `NN-1`

use anyhow::{bail, Context, Result};
use sqlx::{Executor, SqlitePool};
use tracing::debug;

struct Migration {
    version: i32,
    up_sql: &'static str,
    down_sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    up_sql: include_str!("migration_01_up.sql"),
    down_sql: include_str!("migration_01_down.sql"),
}];

fn find(version: i32) -> Result<&'static Migration> {
    MIGRATIONS
        .iter()
        .find(|m| m.version == version)
        .with_context(|| format!("Migration {version} not found"))
}

/// Moves the schema from `from` to `to`, one version at a time. Every step runs in its own
/// transaction together with the `schema_version` update, and all needed steps are checked to
/// exist before the first one runs.
pub(crate) async fn run(pool: &SqlitePool, from: i32, to: i32) -> Result<()> {
    if from == to {
        debug!("Schema already at version {to}");
        return Ok(());
    }
    check_available(from, to)?;

    if from < to {
        for version in (from + 1)..=to {
            debug!("Applying migration {version:02} (up)");
            apply(pool, find(version)?.up_sql, version).await?;
        }
    } else {
        for version in ((to + 1)..=from).rev() {
            debug!("Applying migration {version:02} (down)");
            apply(pool, find(version)?.down_sql, version - 1).await?;
        }
    }

    debug!("Schema now at version {to}");
    Ok(())
}

async fn apply(pool: &SqlitePool, sql: &str, resulting_version: i32) -> Result<()> {
    let mut tx = pool
        .begin()
        .await
        .context("Failed to begin migration transaction")?;

    tx.execute(sql)
        .await
        .with_context(|| format!("Failed to migrate schema to version {resulting_version}"))?;

    sqlx::query("UPDATE schema_version SET version = ?")
        .bind(resulting_version)
        .execute(&mut *tx)
        .await
        .context("Failed to update schema_version")?;

    tx.commit()
        .await
        .context("Failed to commit migration transaction")?;
    Ok(())
}

fn check_available(from: i32, to: i32) -> Result<()> {
    let (low, high) = if from < to { (from + 1, to) } else { (to + 1, from) };
    for version in low..=high {
        if !MIGRATIONS.iter().any(|m| m.version == version) {
            bail!("Migration {version} is required to go from version {from} to {to}");
        }
    }
    Ok(())
}
