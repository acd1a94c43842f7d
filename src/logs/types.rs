use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use uuid::Uuid;

/// One inbound HTTP request, as captured by the request-log middleware.
///
/// Records are immutable once written. They leave the store only through a
/// retention cleanup run.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestLogRecord {
    pub timestamp: DateTime<Utc>,
    pub path: String,
    pub method: String,
    pub status_code: u16,
    /// Wall-clock handling time in fractional milliseconds.
    pub response_time_ms: f64,
    pub user_id: Option<i64>,
    pub error_message: Option<String>,
    pub ip_address: Option<IpAddr>,
    pub user_agent: String,
    pub referer: String,
    pub request_size: u64,
    pub response_size: u64,
    pub host: String,
    pub protocol: String,
    /// Raw query string, without the leading `?`.
    pub query_params: String,
    /// Request headers serialized as a JSON object.
    pub request_headers: String,
    pub trace_id: Uuid,
}

impl RequestLogRecord {
    /// Minimal record with a fresh trace id; the remaining fields are empty.
    pub fn new(
        timestamp: DateTime<Utc>,
        method: impl Into<String>,
        path: impl Into<String>,
        status_code: u16,
        response_time_ms: f64,
    ) -> Self {
        Self {
            timestamp,
            path: path.into(),
            method: method.into(),
            status_code,
            response_time_ms,
            user_id: None,
            error_message: None,
            ip_address: None,
            user_agent: String::new(),
            referer: String::new(),
            request_size: 0,
            response_size: 0,
            host: String::new(),
            protocol: String::new(),
            query_params: String::new(),
            request_headers: "{}".into(),
            trace_id: Uuid::new_v4(),
        }
    }

}

/// Summary statistics over the raw logs of one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DailyStats {
    pub total_requests: u64,
    pub avg_response_time_ms: f64,
    pub status_2xx: u64,
    pub status_3xx: u64,
    pub status_4xx: u64,
    /// Codes 500 and above; also reported as the error count.
    pub status_5xx: u64,
}

/// One persisted row per calendar day (UTC) for which raw logs existed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAggregate {
    pub date: NaiveDate,
    pub total_requests: u64,
    pub avg_response_time_ms: f64,
    pub error_count: u64,
    pub status_2xx: u64,
    pub status_3xx: u64,
    pub status_4xx: u64,
    pub status_5xx: u64,
}

impl DailyAggregate {
    pub fn from_stats(date: NaiveDate, stats: DailyStats) -> Self {
        Self {
            date,
            total_requests: stats.total_requests,
            avg_response_time_ms: stats.avg_response_time_ms,
            error_count: stats.status_5xx,
            status_2xx: stats.status_2xx,
            status_3xx: stats.status_3xx,
            status_4xx: stats.status_4xx,
            status_5xx: stats.status_5xx,
        }
    }
}
