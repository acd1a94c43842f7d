mod codec;
mod repository;
mod schema;

use crate::error::{StoreError, StoreResult};
use crate::logs::traits::{LogStore, LogTransaction, StoreFuture};
use crate::logs::types::{DailyAggregate, DailyStats, RequestLogRecord};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::path::Path;
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed request log store.
///
/// Raw timestamps are stored as UTC unix milliseconds, so calendar dates are
/// UTC dates. Aggregates are keyed by `YYYY-MM-DD`.
#[derive(Clone)]
pub struct SqliteLogStore {
    pool: SqlitePool,
}

impl SqliteLogStore {
    /// Open (or create) the database file at `path`.
    pub async fn open(path: &Path, max_connections: u32) -> StoreResult<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StoreError::Unavailable(format!("create {}: {e}", parent.display()))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        schema::init_schema(&pool).await?;
        tracing::debug!("request log store opened at {}", path.display());

        Ok(Self { pool })
    }

    /// Open a private in-memory database.
    ///
    /// The pool is pinned to one long-lived connection because every SQLite
    /// `:memory:` connection is a separate database.
    pub async fn in_memory() -> StoreResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        schema::init_schema(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn count_raw_logs(&self) -> StoreResult<u64> {
        repository::count_raw_logs(&self.pool).await
    }

    pub async fn get_aggregate(&self, date: NaiveDate) -> StoreResult<Option<DailyAggregate>> {
        let mut conn = self.pool.acquire().await?;
        repository::get_aggregate(&mut conn, date).await
    }

    /// All aggregates, oldest date first.
    pub async fn list_aggregates(&self) -> StoreResult<Vec<DailyAggregate>> {
        repository::list_aggregates(&self.pool).await
    }

    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl LogStore for SqliteLogStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn begin(&self) -> StoreFuture<'_, Box<dyn LogTransaction>> {
        Box::pin(async move {
            let tx = self.pool.begin().await?;
            Ok(Box::new(SqliteLogTransaction { tx }) as Box<dyn LogTransaction>)
        })
    }

    fn insert_batch<'a>(&'a self, records: &'a [RequestLogRecord]) -> StoreFuture<'a, u64> {
        Box::pin(async move { repository::insert_batch(&self.pool, records).await })
    }
}

/// Wraps a pooled sqlx transaction. sqlx rolls back on drop, which is what
/// makes an abandoned (timed out) cleanup run leave the store untouched.
pub struct SqliteLogTransaction {
    tx: Transaction<'static, Sqlite>,
}

impl LogTransaction for SqliteLogTransaction {
    fn distinct_dates_before(
        &mut self,
        cutoff: DateTime<Utc>,
    ) -> StoreFuture<'_, Vec<NaiveDate>> {
        Box::pin(async move { repository::distinct_dates_before(&mut self.tx, cutoff).await })
    }

    fn sum_stats_for_date(&mut self, date: NaiveDate) -> StoreFuture<'_, Option<DailyStats>> {
        Box::pin(async move { repository::sum_stats_for_date(&mut self.tx, date).await })
    }

    fn aggregate_for_date(&mut self, date: NaiveDate) -> StoreFuture<'_, Option<DailyAggregate>> {
        Box::pin(async move { repository::get_aggregate(&mut self.tx, date).await })
    }

    fn upsert_aggregate<'a>(&'a mut self, aggregate: &'a DailyAggregate) -> StoreFuture<'a, ()> {
        Box::pin(async move { repository::upsert_aggregate(&mut self.tx, aggregate).await })
    }

    fn delete_raw_logs_before(
        &mut self,
        cutoff: DateTime<Utc>,
        limit: u64,
    ) -> StoreFuture<'_, u64> {
        Box::pin(
            async move { repository::delete_raw_logs_before(&mut self.tx, cutoff, limit).await },
        )
    }

    fn delete_aggregates_before(&mut self, cutoff: NaiveDate) -> StoreFuture<'_, u64> {
        Box::pin(async move { repository::delete_aggregates_before(&mut self.tx, cutoff).await })
    }

    fn commit(self: Box<Self>) -> StoreFuture<'static, ()> {
        Box::pin(async move {
            self.tx.commit().await?;
            Ok(())
        })
    }

    fn rollback(self: Box<Self>) -> StoreFuture<'static, ()> {
        Box::pin(async move {
            self.tx.rollback().await?;
            Ok(())
        })
    }
}
