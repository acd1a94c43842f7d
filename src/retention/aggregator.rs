use crate::error::StoreResult;
use crate::logs::{DailyAggregate, LogTransaction};
use chrono::NaiveDate;

/// Recompute the daily aggregate for `date` inside `tx` and store it.
///
/// Rerunning over the same raw rows writes the same values. An existing
/// aggregate that covers more requests than the raw rows still present is
/// kept as is: it was computed before an earlier run deleted part of that
/// day, and overwriting it would shrink history. Returns the aggregate now
/// stored, or `None` when the date has neither raw rows nor an aggregate.
pub async fn aggregate_date(
    tx: &mut dyn LogTransaction,
    date: NaiveDate,
) -> StoreResult<Option<DailyAggregate>> {
    let stats = tx.sum_stats_for_date(date).await?;
    let existing = tx.aggregate_for_date(date).await?;

    let Some(stats) = stats else {
        return Ok(existing);
    };

    if let Some(existing) = existing
        && existing.total_requests > stats.total_requests
    {
        tracing::debug!(
            %date,
            stored = existing.total_requests,
            remaining = stats.total_requests,
            "keeping aggregate computed before partial deletion"
        );
        return Ok(Some(existing));
    }

    let aggregate = DailyAggregate::from_stats(date, stats);
    tx.upsert_aggregate(&aggregate).await?;
    Ok(Some(aggregate))
}
