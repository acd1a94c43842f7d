use super::aggregator::aggregate_date;
use super::policy::RetentionPolicy;
use super::scheduler::{JobFuture, RetentionJob};
use crate::config::RetentionConfig;
use crate::error::RetentionError;
use crate::logs::{DailyAggregate, LogStore, LogTransaction};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// What one cleanup run did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleanupReport {
    pub detailed_cutoff: Option<DateTime<Utc>>,
    pub aggregate_cutoff: Option<NaiveDate>,
    pub dates_aggregated: u64,
    pub raw_deleted: u64,
    pub delete_batches: u64,
    /// The run stopped at the per-run deletion cap; eligible rows may remain.
    pub cap_reached: bool,
    pub aggregates_deleted: u64,
    pub elapsed_ms: u64,
}

impl CleanupReport {
    pub fn is_noop(&self) -> bool {
        self.dates_aggregated == 0 && self.raw_deleted == 0 && self.aggregates_deleted == 0
    }
}

/// Aggregates expiring raw request logs into daily rows, then purges the
/// raw rows and expired aggregates, all inside one store transaction.
pub struct CleanupEngine {
    store: Arc<dyn LogStore>,
    policy: RetentionPolicy,
}

impl CleanupEngine {
    pub fn new(store: Arc<dyn LogStore>, policy: RetentionPolicy) -> Self {
        Self { store, policy }
    }

    /// Build an engine from the `[retention]` section, rejecting invalid
    /// settings before any run can start.
    pub fn from_config(
        store: Arc<dyn LogStore>,
        config: &RetentionConfig,
    ) -> Result<Self, RetentionError> {
        let policy = RetentionPolicy::from_config(config)?;
        Ok(Self::new(store, policy))
    }

    pub fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    /// Run one full cleanup pass against `now`.
    ///
    /// Either every step commits or none does. Dropping the returned future
    /// before it resolves drops the open transaction, which rolls it back.
    pub async fn run_cleanup(&self, now: DateTime<Utc>) -> Result<CleanupReport, RetentionError> {
        let started = Instant::now();
        let mut tx = self.store.begin().await?;

        match self.run_in(tx.as_mut(), now).await {
            Ok(mut report) => {
                tx.commit().await?;
                report.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                tracing::info!(
                    store = self.store.name(),
                    dates_aggregated = report.dates_aggregated,
                    raw_deleted = report.raw_deleted,
                    batches = report.delete_batches,
                    cap_reached = report.cap_reached,
                    aggregates_deleted = report.aggregates_deleted,
                    elapsed_ms = report.elapsed_ms,
                    "request log cleanup completed"
                );
                Ok(report)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!("cleanup rollback failed: {rollback_err}");
                }
                Err(err)
            }
        }
    }

    /// Recompute the aggregate for a single date in its own transaction.
    pub async fn aggregate(&self, date: NaiveDate) -> Result<Option<DailyAggregate>, RetentionError> {
        let mut tx = self.store.begin().await?;
        match aggregate_date(tx.as_mut(), date).await {
            Ok(aggregate) => {
                tx.commit().await?;
                Ok(aggregate)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(%date, "aggregate rollback failed: {rollback_err}");
                }
                Err(err.into())
            }
        }
    }

    async fn run_in(
        &self,
        tx: &mut dyn LogTransaction,
        now: DateTime<Utc>,
    ) -> Result<CleanupReport, RetentionError> {
        let detailed_cutoff = self.policy.detailed_cutoff(now);
        let aggregate_cutoff = self.policy.aggregate_cutoff(now);
        let mut report = CleanupReport {
            detailed_cutoff: Some(detailed_cutoff),
            aggregate_cutoff: Some(aggregate_cutoff),
            ..CleanupReport::default()
        };

        // Every expiring day is summarized before any of its raw rows go.
        let dates = tx.distinct_dates_before(detailed_cutoff).await?;
        for date in dates {
            aggregate_date(tx, date).await?;
            report.dates_aggregated += 1;
        }

        let batch_size = u64::from(self.policy.batch_size());
        let max_deletions = u64::from(self.policy.max_deletions_per_run());
        while report.raw_deleted < max_deletions {
            let limit = batch_size.min(max_deletions - report.raw_deleted);
            let deleted = tx.delete_raw_logs_before(detailed_cutoff, limit).await?;
            if deleted == 0 {
                break;
            }
            report.raw_deleted += deleted;
            report.delete_batches += 1;
            tracing::debug!(
                batch = report.delete_batches,
                deleted,
                total = report.raw_deleted,
                "deleted raw request log batch"
            );
        }
        if report.raw_deleted >= max_deletions {
            report.cap_reached = true;
            tracing::debug!(
                max_deletions,
                "deletion cap reached, remaining rows left for the next run"
            );
        }

        report.aggregates_deleted = tx.delete_aggregates_before(aggregate_cutoff).await?;

        Ok(report)
    }
}

impl RetentionJob for CleanupEngine {
    fn name(&self) -> &str {
        "request_log_cleanup"
    }

    fn run(&self, now: DateTime<Utc>) -> JobFuture<'_> {
        Box::pin(self.run_cleanup(now))
    }
}
