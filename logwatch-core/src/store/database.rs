// Connection pool and schema setup for the log archive

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::{debug, error, info};

const SCHEMA_SQL: &str = include_str!("../../migrations/001_log_archive.sql");

/// Sizing and lock handling of the archive pool.
///
/// Several monitors share one archive, so writers wait up to
/// `busy_timeout` for the WAL write lock before an insert fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub busy_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 5,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// Open a pool on `database_path` in WAL mode, creating the file if needed.
pub async fn create_pool(database_path: &Path, settings: PoolSettings) -> Result<SqlitePool> {
    if settings.max_connections == 0 {
        anyhow::bail!("Archive pool needs at least one connection");
    }

    info!(
        "Opening log archive at {} ({} connections)",
        database_path.display(),
        settings.max_connections
    );

    let connect_options = SqliteConnectOptions::new()
        .filename(database_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(settings.busy_timeout);

    let pool = SqlitePoolOptions::new()
        .max_connections(settings.max_connections)
        .connect_with(connect_options)
        .await
        .with_context(|| format!("Failed to open log archive {}", database_path.display()))?;

    debug!("Archive pool ready");
    Ok(pool)
}

/// Split the embedded migration into single statements.
///
/// Standalone comment lines are dropped, trailing `--` comments are cut,
/// and a statement ends at a line ending in `;`.
fn schema_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();

    for line in sql.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || (trimmed.starts_with("--") && current.is_empty()) {
            continue;
        }

        match trimmed.find("--") {
            Some(pos) => current.push_str(trimmed[..pos].trim_end()),
            None => current.push_str(trimmed),
        }
        current.push(' ');

        if current.trim_end().ends_with(';') {
            let statement = current.trim().trim_end_matches(';').trim().to_string();
            if !statement.is_empty() {
                statements.push(statement);
            }
            current.clear();
        }
    }

    statements
}

pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    for statement in schema_statements(SCHEMA_SQL) {
        debug!("Executing: {}", &statement[..statement.len().min(80)]);
        sqlx::query(&statement)
            .execute(pool)
            .await
            .with_context(|| {
                format!(
                    "Failed to execute schema statement: {}",
                    &statement[..statement.len().min(200)]
                )
            })?;
    }
    Ok(())
}

/// True when the archive table exists.
pub async fn verify_schema(pool: &SqlitePool) -> Result<bool> {
    let tables: Vec<(String,)> = sqlx::query_as(
        "SELECT name FROM sqlite_master WHERE type='table' AND name = 'log_entries'",
    )
    .fetch_all(pool)
    .await
    .context("Failed to query table existence")?;

    if tables.is_empty() {
        error!("Table log_entries is missing");
    }
    Ok(!tables.is_empty())
}
