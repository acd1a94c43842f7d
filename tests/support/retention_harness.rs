#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, NaiveDate, Utc};

use shortlinks::StoreError;
use shortlinks::logs::{
    DailyAggregate, DailyStats, LogStore, LogTransaction, RequestLogRecord, SqliteLogStore,
    StoreFuture,
};

pub async fn memory_store() -> Arc<SqliteLogStore> {
    Arc::new(
        SqliteLogStore::in_memory()
            .await
            .expect("in-memory store should open"),
    )
}

/// `count` records one second apart starting at `start`.
pub fn records(start: DateTime<Utc>, count: usize, status: u16) -> Vec<RequestLogRecord> {
    (0..count)
        .map(|i| {
            let offset = Duration::seconds(i64::try_from(i).expect("small count"));
            let mut record = RequestLogRecord::new(start + offset, "GET", "/go/docs", status, 8.0);
            record.host = "sho.rt".into();
            record
        })
        .collect()
}

pub async fn seed(store: &SqliteLogStore, records: &[RequestLogRecord]) {
    store
        .insert_batch(records)
        .await
        .expect("seed records should insert");
}

/// How a [`ScriptedStore`] transaction misbehaves.
#[derive(Debug, Clone, Copy, Default)]
pub enum Fault {
    #[default]
    None,
    /// Fail the n-th raw delete batch (1-based).
    FailDeleteBatch(usize),
    /// Never resolve the first raw delete batch.
    HangOnDelete,
    FailAggregateDelete,
}

/// Wraps a real store, journaling every transaction call and injecting one
/// fault.
pub struct ScriptedStore {
    inner: Arc<SqliteLogStore>,
    fault: Fault,
    journal: Arc<Mutex<Vec<String>>>,
}

impl ScriptedStore {
    pub fn new(inner: Arc<SqliteLogStore>, fault: Fault) -> Self {
        Self {
            inner,
            fault,
            journal: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn journal(&self) -> Vec<String> {
        self.journal.lock().expect("journal lock").clone()
    }
}

impl LogStore for ScriptedStore {
    fn name(&self) -> &str {
        "scripted"
    }

    fn begin(&self) -> StoreFuture<'_, Box<dyn LogTransaction>> {
        Box::pin(async move {
            let inner = self.inner.begin().await?;
            let tx: Box<dyn LogTransaction> = Box::new(ScriptedTransaction {
                inner,
                fault: self.fault,
                delete_calls: 0,
                journal: Arc::clone(&self.journal),
            });
            Ok(tx)
        })
    }

    fn insert_batch<'a>(&'a self, records: &'a [RequestLogRecord]) -> StoreFuture<'a, u64> {
        self.inner.insert_batch(records)
    }
}

struct ScriptedTransaction {
    inner: Box<dyn LogTransaction>,
    fault: Fault,
    delete_calls: usize,
    journal: Arc<Mutex<Vec<String>>>,
}

impl ScriptedTransaction {
    fn note(&self, entry: impl Into<String>) {
        self.journal.lock().expect("journal lock").push(entry.into());
    }
}

fn injected<'a, T: Send + 'a>(what: &str) -> StoreFuture<'a, T> {
    let message = format!("injected {what} failure");
    Box::pin(async move { Err(StoreError::Unavailable(message)) })
}

impl LogTransaction for ScriptedTransaction {
    fn distinct_dates_before(
        &mut self,
        cutoff: DateTime<Utc>,
    ) -> StoreFuture<'_, Vec<NaiveDate>> {
        self.note("distinct_dates");
        self.inner.distinct_dates_before(cutoff)
    }

    fn sum_stats_for_date(&mut self, date: NaiveDate) -> StoreFuture<'_, Option<DailyStats>> {
        self.note(format!("sum_stats:{date}"));
        self.inner.sum_stats_for_date(date)
    }

    fn aggregate_for_date(&mut self, date: NaiveDate) -> StoreFuture<'_, Option<DailyAggregate>> {
        self.inner.aggregate_for_date(date)
    }

    fn upsert_aggregate<'a>(&'a mut self, aggregate: &'a DailyAggregate) -> StoreFuture<'a, ()> {
        self.note(format!("upsert:{}", aggregate.date));
        self.inner.upsert_aggregate(aggregate)
    }

    fn delete_raw_logs_before(
        &mut self,
        cutoff: DateTime<Utc>,
        limit: u64,
    ) -> StoreFuture<'_, u64> {
        self.delete_calls += 1;
        self.note(format!("delete_raw:{limit}"));
        match self.fault {
            Fault::FailDeleteBatch(n) if n == self.delete_calls => injected("delete"),
            Fault::HangOnDelete => Box::pin(std::future::pending()),
            _ => self.inner.delete_raw_logs_before(cutoff, limit),
        }
    }

    fn delete_aggregates_before(&mut self, cutoff: NaiveDate) -> StoreFuture<'_, u64> {
        self.note(format!("delete_aggregates:{cutoff}"));
        if matches!(self.fault, Fault::FailAggregateDelete) {
            return injected("aggregate delete");
        }
        self.inner.delete_aggregates_before(cutoff)
    }

    fn commit(self: Box<Self>) -> StoreFuture<'static, ()> {
        self.note("commit");
        self.inner.commit()
    }

    fn rollback(self: Box<Self>) -> StoreFuture<'static, ()> {
        self.note("rollback");
        self.inner.rollback()
    }
}
