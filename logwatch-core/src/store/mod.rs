// SQLite archive of captured log entries

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use tracing::{debug, info};

use crate::client::parse_timestamp;
use crate::model::{LogEntry, LogLevel};

pub mod database;

pub use database::PoolSettings;

/// Rows returned by one `query` call at most.
pub const QUERY_LIMIT: i64 = 1000;

/// Durable, deduplicated archive of log entries.
///
/// Cloning is cheap and every clone shares the same pool, so one archive
/// can be handed to many monitors.
#[derive(Debug, Clone)]
pub struct LogStore {
    pool: SqlitePool,
}

impl LogStore {
    /// Open (or create) the archive at `database_path` with default pool settings.
    pub async fn open<P: AsRef<Path>>(database_path: P) -> Result<Self> {
        Self::open_with(database_path, PoolSettings::default()).await
    }

    pub async fn open_with<P: AsRef<Path>>(database_path: P, settings: PoolSettings) -> Result<Self> {
        let database_path = database_path.as_ref();
        crate::db_path::ensure_data_dir_for(database_path).with_context(|| {
            format!("Failed to create directory for {}", database_path.display())
        })?;

        let pool = database::create_pool(database_path, settings).await?;
        database::create_schema(&pool).await?;

        if !database::verify_schema(&pool).await? {
            anyhow::bail!("Log archive schema verification failed");
        }

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert `entries`, skipping any already archived under the same
    /// (timestamp, service, message). Returns how many rows were new.
    pub async fn store(&self, entries: &[LogEntry]) -> Result<u64> {
        if entries.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        let mut inserted = 0;
        let mut seen = HashSet::with_capacity(entries.len());

        for entry in entries {
            // repeats inside one batch never reach the database
            if !seen.insert(entry.dedup_key()) {
                continue;
            }

            let raw_data = serde_json::to_string(entry.raw_data())?;
            let result = sqlx::query(
                "INSERT OR IGNORE INTO log_entries
                    (timestamp, service_id, level, message, source, raw_data)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(format_timestamp(entry.timestamp()))
            .bind(entry.service_id())
            .bind(entry.level().as_str())
            .bind(entry.message())
            .bind(entry.source())
            .bind(raw_data)
            .execute(&mut *tx)
            .await
            .context("Failed to insert log entry")?;

            inserted += result.rows_affected();
        }

        tx.commit().await.context("Failed to commit log entries")?;

        debug!("Archived {} of {} entries", inserted, entries.len());
        Ok(inserted)
    }

    /// Archived entries newer than `since_hours` ago, newest first.
    ///
    /// `service_id` and `level` narrow the result when given; both filters
    /// must hold. At most `QUERY_LIMIT` rows come back.
    pub async fn query(
        &self,
        service_id: Option<&str>,
        since_hours: u32,
        level: Option<LogLevel>,
    ) -> Result<Vec<LogEntry>> {
        let cutoff = cutoff(since_hours)?;

        let mut query_builder = sqlx::QueryBuilder::new(
            "SELECT timestamp, service_id, message, source, raw_data \
             FROM log_entries \
             WHERE timestamp >= ",
        );
        query_builder.push_bind(format_timestamp(cutoff));

        if let Some(service_id) = service_id {
            query_builder.push(" AND service_id = ");
            query_builder.push_bind(service_id);
        }

        if let Some(level) = level {
            query_builder.push(" AND level = ");
            query_builder.push_bind(level.as_str());
        }

        query_builder.push(" ORDER BY timestamp DESC LIMIT ");
        query_builder.push_bind(QUERY_LIMIT);

        let rows = query_builder
            .build_query_as::<StoredLog>()
            .fetch_all(&self.pool)
            .await
            .context("Failed to query log archive")?;

        Ok(rows.into_iter().map(|row| row.0).collect())
    }

    /// Delete entries older than `hours` ago. Returns the number removed.
    ///
    /// A zero horizon would empty the archive and is refused.
    pub async fn purge_older_than(&self, hours: u32) -> Result<u64> {
        if hours == 0 {
            anyhow::bail!("Retention horizon must be at least one hour");
        }
        let cutoff = cutoff(hours)?;
        let result = sqlx::query("DELETE FROM log_entries WHERE timestamp < ?")
            .bind(format_timestamp(cutoff))
            .execute(&self.pool)
            .await
            .context("Failed to purge log archive")?;

        info!(
            "Purged {} entries older than {} hours",
            result.rows_affected(),
            hours
        );
        Ok(result.rows_affected())
    }

    pub async fn count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM log_entries")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count log entries")?;
        Ok(count.0)
    }
}

/// The instant `hours` before now.
fn cutoff(hours: u32) -> Result<DateTime<Utc>> {
    Duration::try_hours(i64::from(hours))
        .and_then(|span| Utc::now().checked_sub_signed(span))
        .with_context(|| format!("{} hours reaches past the earliest supported time", hours))
}

/// Fixed-width UTC text, so string order matches time order.
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

struct StoredLog(LogEntry);

impl sqlx::FromRow<'_, SqliteRow> for StoredLog {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let timestamp_str: String = row.try_get("timestamp")?;
        let timestamp = parse_timestamp(&timestamp_str).ok_or_else(|| {
            sqlx::Error::Decode(Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("invalid timestamp in archive: {}", timestamp_str),
            )))
        })?;

        let raw_data: Option<String> = row.try_get("raw_data")?;
        let raw_data = raw_data
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or(serde_json::Value::Null);

        let message: String = row.try_get("message")?;
        let service_id: String = row.try_get("service_id")?;
        let source: String = row.try_get("source")?;

        Ok(StoredLog(LogEntry::new(
            timestamp, message, service_id, source, raw_data,
        )))
    }
}
