use super::types::{DailyAggregate, DailyStats, RequestLogRecord};
use crate::error::StoreResult;
use chrono::{DateTime, NaiveDate, Utc};
use std::future::Future;
use std::pin::Pin;

pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = StoreResult<T>> + Send + 'a>>;

/// Persistence for raw request logs and their daily aggregates.
pub trait LogStore: Send + Sync {
    /// Backend name (e.g. "sqlite")
    fn name(&self) -> &str;

    /// Open a unit of work. Every retention read and write goes through one.
    fn begin(&self) -> StoreFuture<'_, Box<dyn LogTransaction>>;

    /// Persist a batch of raw records atomically. Returns rows written.
    fn insert_batch<'a>(&'a self, records: &'a [RequestLogRecord]) -> StoreFuture<'a, u64>;
}

/// Transaction-scoped view of a [`LogStore`].
///
/// Dropping a transaction without calling [`commit`](Self::commit) discards
/// its writes, so an abandoned run never leaves partial state behind.
pub trait LogTransaction: Send {
    /// Distinct calendar dates among raw records with `timestamp < cutoff`,
    /// oldest first.
    fn distinct_dates_before(&mut self, cutoff: DateTime<Utc>)
    -> StoreFuture<'_, Vec<NaiveDate>>;

    /// Statistics over the raw records of `date`; `None` when there are none.
    fn sum_stats_for_date(&mut self, date: NaiveDate) -> StoreFuture<'_, Option<DailyStats>>;

    /// The stored aggregate for `date`, if any.
    fn aggregate_for_date(&mut self, date: NaiveDate) -> StoreFuture<'_, Option<DailyAggregate>>;

    /// Insert or overwrite the aggregate row keyed by `aggregate.date`.
    fn upsert_aggregate<'a>(&'a mut self, aggregate: &'a DailyAggregate) -> StoreFuture<'a, ()>;

    /// Delete at most `limit` raw records with `timestamp < cutoff`.
    /// Returns the number actually deleted; zero means none remain.
    fn delete_raw_logs_before(
        &mut self,
        cutoff: DateTime<Utc>,
        limit: u64,
    ) -> StoreFuture<'_, u64>;

    /// Delete every aggregate with `date < cutoff`.
    fn delete_aggregates_before(&mut self, cutoff: NaiveDate) -> StoreFuture<'_, u64>;

    fn commit(self: Box<Self>) -> StoreFuture<'static, ()>;

    fn rollback(self: Box<Self>) -> StoreFuture<'static, ()>;
}
