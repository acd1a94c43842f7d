use super::codec::{count_from_db, count_to_db, date_from_db, date_to_db, day_bounds_ms};
use crate::error::StoreResult;
use crate::logs::types::{DailyAggregate, DailyStats, RequestLogRecord};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};

type AggregateRow = (String, i64, f64, i64, i64, i64, i64, i64);

const SELECT_AGGREGATE_BY_DATE: &str = "SELECT date, total_requests, avg_response_time_ms,
        error_count, status_2xx, status_3xx, status_4xx, status_5xx
     FROM request_log_aggregates
     WHERE date = ?1";

const SELECT_ALL_AGGREGATES: &str = "SELECT date, total_requests, avg_response_time_ms,
        error_count, status_2xx, status_3xx, status_4xx, status_5xx
     FROM request_log_aggregates
     ORDER BY date";

pub(super) async fn insert_batch(pool: &SqlitePool, records: &[RequestLogRecord]) -> StoreResult<u64> {
    if records.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    let mut written = 0_u64;
    for record in records {
        let result = sqlx::query(
            "INSERT INTO request_logs (
                timestamp_ms, path, method, status_code, response_time_ms,
                user_id, error_message, ip_address, user_agent, referer,
                request_size, response_size, host, protocol, query_params,
                request_headers, trace_id
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
        )
        .bind(record.timestamp.timestamp_millis())
        .bind(&record.path)
        .bind(&record.method)
        .bind(i64::from(record.status_code))
        .bind(record.response_time_ms)
        .bind(record.user_id)
        .bind(record.error_message.as_deref())
        .bind(record.ip_address.map(|ip| ip.to_string()))
        .bind(&record.user_agent)
        .bind(&record.referer)
        .bind(count_to_db(record.request_size))
        .bind(count_to_db(record.response_size))
        .bind(&record.host)
        .bind(&record.protocol)
        .bind(&record.query_params)
        .bind(&record.request_headers)
        .bind(record.trace_id.to_string())
        .execute(&mut *tx)
        .await?;
        written += result.rows_affected();
    }
    tx.commit().await?;

    Ok(written)
}

pub(super) async fn distinct_dates_before(
    conn: &mut SqliteConnection,
    cutoff: DateTime<Utc>,
) -> StoreResult<Vec<NaiveDate>> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT DISTINCT date(timestamp_ms / 1000, 'unixepoch') AS day
         FROM request_logs
         WHERE timestamp_ms < ?1
         ORDER BY day",
    )
    .bind(cutoff.timestamp_millis())
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(|(raw,)| date_from_db(raw)).collect()
}

pub(super) async fn sum_stats_for_date(
    conn: &mut SqliteConnection,
    date: NaiveDate,
) -> StoreResult<Option<DailyStats>> {
    let (start_ms, end_ms) = day_bounds_ms(date);
    let (total, avg, s2xx, s3xx, s4xx, s5xx): (
        i64,
        Option<f64>,
        Option<i64>,
        Option<i64>,
        Option<i64>,
        Option<i64>,
    ) = sqlx::query_as(
        "SELECT
            COUNT(*),
            AVG(response_time_ms),
            SUM(CASE WHEN status_code >= 200 AND status_code < 300 THEN 1 ELSE 0 END),
            SUM(CASE WHEN status_code >= 300 AND status_code < 400 THEN 1 ELSE 0 END),
            SUM(CASE WHEN status_code >= 400 AND status_code < 500 THEN 1 ELSE 0 END),
            SUM(CASE WHEN status_code >= 500 THEN 1 ELSE 0 END)
         FROM request_logs
         WHERE timestamp_ms >= ?1 AND timestamp_ms < ?2",
    )
    .bind(start_ms)
    .bind(end_ms)
    .fetch_one(&mut *conn)
    .await?;

    if total == 0 {
        return Ok(None);
    }

    Ok(Some(DailyStats {
        total_requests: count_from_db(total),
        avg_response_time_ms: avg.unwrap_or(0.0),
        status_2xx: count_from_db(s2xx.unwrap_or(0)),
        status_3xx: count_from_db(s3xx.unwrap_or(0)),
        status_4xx: count_from_db(s4xx.unwrap_or(0)),
        status_5xx: count_from_db(s5xx.unwrap_or(0)),
    }))
}

pub(super) async fn upsert_aggregate(
    conn: &mut SqliteConnection,
    aggregate: &DailyAggregate,
) -> StoreResult<()> {
    sqlx::query(
        "INSERT INTO request_log_aggregates (
            date, total_requests, avg_response_time_ms, error_count,
            status_2xx, status_3xx, status_4xx, status_5xx
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(date) DO UPDATE SET
            total_requests = excluded.total_requests,
            avg_response_time_ms = excluded.avg_response_time_ms,
            error_count = excluded.error_count,
            status_2xx = excluded.status_2xx,
            status_3xx = excluded.status_3xx,
            status_4xx = excluded.status_4xx,
            status_5xx = excluded.status_5xx",
    )
    .bind(date_to_db(aggregate.date))
    .bind(count_to_db(aggregate.total_requests))
    .bind(aggregate.avg_response_time_ms)
    .bind(count_to_db(aggregate.error_count))
    .bind(count_to_db(aggregate.status_2xx))
    .bind(count_to_db(aggregate.status_3xx))
    .bind(count_to_db(aggregate.status_4xx))
    .bind(count_to_db(aggregate.status_5xx))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(super) async fn delete_raw_logs_before(
    conn: &mut SqliteConnection,
    cutoff: DateTime<Utc>,
    limit: u64,
) -> StoreResult<u64> {
    if limit == 0 {
        return Ok(0);
    }

    let result = sqlx::query(
        "DELETE FROM request_logs
         WHERE id IN (
             SELECT id FROM request_logs
             WHERE timestamp_ms < ?1
             ORDER BY id
             LIMIT ?2
         )",
    )
    .bind(cutoff.timestamp_millis())
    .bind(count_to_db(limit))
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

pub(super) async fn delete_aggregates_before(
    conn: &mut SqliteConnection,
    cutoff: NaiveDate,
) -> StoreResult<u64> {
    let result = sqlx::query("DELETE FROM request_log_aggregates WHERE date < ?1")
        .bind(date_to_db(cutoff))
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

pub(super) async fn count_raw_logs(pool: &SqlitePool) -> StoreResult<u64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM request_logs")
        .fetch_one(pool)
        .await?;
    Ok(count_from_db(count))
}

pub(super) async fn get_aggregate(
    conn: &mut SqliteConnection,
    date: NaiveDate,
) -> StoreResult<Option<DailyAggregate>> {
    let row: Option<AggregateRow> = sqlx::query_as(SELECT_AGGREGATE_BY_DATE)
        .bind(date_to_db(date))
        .fetch_optional(&mut *conn)
        .await?;

    row.map(aggregate_from_row).transpose()
}

pub(super) async fn list_aggregates(pool: &SqlitePool) -> StoreResult<Vec<DailyAggregate>> {
    let rows: Vec<AggregateRow> = sqlx::query_as(SELECT_ALL_AGGREGATES)
        .fetch_all(pool)
        .await?;

    rows.into_iter().map(aggregate_from_row).collect()
}

fn aggregate_from_row(row: AggregateRow) -> StoreResult<DailyAggregate> {
    let (date, total, avg, errors, s2xx, s3xx, s4xx, s5xx) = row;
    Ok(DailyAggregate {
        date: date_from_db(&date)?,
        total_requests: count_from_db(total),
        avg_response_time_ms: avg,
        error_count: count_from_db(errors),
        status_2xx: count_from_db(s2xx),
        status_3xx: count_from_db(s3xx),
        status_4xx: count_from_db(s4xx),
        status_5xx: count_from_db(s5xx),
    })
}
