// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Database Migration Command
//!
//! Implements `devreg migrate`, which applies the embedded schema migrations
//! to the configured PostgreSQL database.
//!
//! # Usage
//!
//! ```bash
//! # Apply all pending migrations
//! devreg migrate
//!
//! # Preview migrations without applying
//! devreg migrate --dry-run
//! ```

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::collections::HashSet;

use device_registry_core::domain::repository::StorageBackend;
use device_registry_core::domain::service_config::ServiceConfig;
use device_registry_core::infrastructure::db::{Database, MIGRATOR};

#[derive(Args)]
pub struct MigrateCommand {
    /// Perform a dry run without applying changes
    #[arg(long)]
    dry_run: bool,
}

pub async fn execute(cmd: MigrateCommand, config: &ServiceConfig) -> Result<()> {
    println!("{}", "Device Registry Migrate".bold().green());

    let pg = match config.storage_backend()? {
        StorageBackend::PostgreSQL(pg) => pg,
        StorageBackend::InMemory => {
            println!("{}", "In-memory storage has no schema to migrate.".yellow());
            return Ok(());
        }
    };

    println!("Connecting to database...");
    let db = Database::new(pg.connect_options, 1)
        .await
        .context("Failed to connect to database")?;

    let applied = applied_versions(
        sqlx::query_scalar::<_, i64>("SELECT version FROM _sqlx_migrations WHERE success")
            .fetch_all(db.get_pool())
            .await,
    )?;

    let pending: Vec<_> = MIGRATOR
        .iter()
        .filter(|m| !applied.contains(&m.version))
        .collect();

    println!(
        "Migration status: {} applied, {} total available.",
        applied.len(),
        MIGRATOR.iter().count()
    );

    if pending.is_empty() {
        println!("{}", "✓ Database is up to date.".green());
        db.close().await;
        return Ok(());
    }

    if cmd.dry_run {
        println!("Pending migrations found (Dry Run):");
        for migration in &pending {
            println!(" - {} {}", migration.version, migration.description);
        }
        println!("Skipping application due to --dry-run");
        db.close().await;
        return Ok(());
    }

    println!("Applying {} pending migration(s)...", pending.len());
    db.migrate().await.context("Failed to apply migrations")?;
    db.close().await;
    println!("{}", "✓ Database updated successfully.".green());

    Ok(())
}

/// Postgres SQLSTATE for `undefined_table`
const UNDEFINED_TABLE: &str = "42P01";

/// Versions recorded as applied. The bookkeeping table does not exist before
/// the first run; any other failure is an error.
fn applied_versions(result: Result<Vec<i64>, sqlx::Error>) -> Result<HashSet<i64>> {
    match result {
        Ok(versions) => Ok(versions.into_iter().collect()),
        Err(err) if is_undefined_table(&err) => Ok(HashSet::new()),
        Err(err) => Err(err).context("Failed to read applied migrations"),
    }
}

fn is_undefined_table(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db_err| db_err.code())
        .is_some_and(|code| code == UNDEFINED_TABLE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_applied_versions_collects_rows() {
        let applied = applied_versions(Ok(vec![1, 1, 2])).unwrap();
        assert_eq!(applied, HashSet::from([1, 2]));
    }

    #[test]
    fn test_connection_failure_is_not_treated_as_fresh_database() {
        let err = applied_versions(Err(sqlx::Error::PoolTimedOut)).unwrap_err();
        assert!(err.to_string().contains("Failed to read applied migrations"));
    }

    #[test]
    fn test_non_database_errors_are_not_undefined_table() {
        assert!(!is_undefined_table(&sqlx::Error::RowNotFound));
        assert!(!is_undefined_table(&sqlx::Error::PoolClosed));
    }
}
