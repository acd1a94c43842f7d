use crate::error::StoreResult;
use sqlx::SqlitePool;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS request_logs (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp_ms     INTEGER NOT NULL,
    path             TEXT NOT NULL,
    method           TEXT NOT NULL,
    status_code      INTEGER NOT NULL,
    response_time_ms REAL NOT NULL,
    user_id          INTEGER,
    error_message    TEXT,
    ip_address       TEXT,
    user_agent       TEXT NOT NULL DEFAULT '',
    referer          TEXT NOT NULL DEFAULT '',
    request_size     INTEGER NOT NULL DEFAULT 0,
    response_size    INTEGER NOT NULL DEFAULT 0,
    host             TEXT NOT NULL DEFAULT '',
    protocol         TEXT NOT NULL DEFAULT '',
    query_params     TEXT NOT NULL DEFAULT '',
    request_headers  TEXT NOT NULL DEFAULT '{}',
    trace_id         TEXT NOT NULL UNIQUE
);
CREATE INDEX IF NOT EXISTS idx_request_logs_timestamp ON request_logs(timestamp_ms);

CREATE TABLE IF NOT EXISTS request_log_aggregates (
    date                 TEXT PRIMARY KEY,
    total_requests       INTEGER NOT NULL,
    avg_response_time_ms REAL NOT NULL,
    error_count          INTEGER NOT NULL,
    status_2xx           INTEGER NOT NULL,
    status_3xx           INTEGER NOT NULL,
    status_4xx           INTEGER NOT NULL,
    status_5xx           INTEGER NOT NULL
);
";

pub(super) async fn init_schema(pool: &SqlitePool) -> StoreResult<()> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    Ok(())
}
