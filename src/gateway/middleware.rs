use crate::logs::{RequestLogBuffer, RequestLogRecord};
use axum::{
    body::HttpBody,
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Authenticated user id, attached as a request or response extension by an
/// auth layer. The request logger copies it into the record when present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestUser(pub i64);

/// Axum middleware: time the request, then queue one [`RequestLogRecord`].
pub async fn log_requests(
    State(buffer): State<Arc<RequestLogBuffer>>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let timestamp = Utc::now();

    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let query_params = request.uri().query().unwrap_or_default().to_string();
    let protocol = format!("{:?}", request.version());
    let headers = request.headers();
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let ip_address = client_ip(headers, peer);
    let user_agent = header_str(headers, header::USER_AGENT);
    let referer = header_str(headers, header::REFERER);
    let host = header_str(headers, header::HOST);
    let request_size = content_length(headers);
    let request_headers = headers_json(headers);
    let request_user = request.extensions().get::<RequestUser>().copied();

    let response = next.run(request).await;

    let status = response.status();
    let user_id = response
        .extensions()
        .get::<RequestUser>()
        .copied()
        .or(request_user)
        .map(|RequestUser(id)| id);
    let response_size = match content_length(response.headers()) {
        0 => response.body().size_hint().exact().unwrap_or(0),
        n => n,
    };

    buffer.push(RequestLogRecord {
        timestamp,
        path,
        method,
        status_code: status.as_u16(),
        response_time_ms: started.elapsed().as_secs_f64() * 1000.0,
        user_id,
        error_message: error_message(status),
        ip_address,
        user_agent,
        referer,
        request_size,
        response_size,
        host,
        protocol,
        query_params,
        request_headers,
        trace_id: Uuid::new_v4(),
    });

    response
}

/// X-Real-IP, then the first X-Forwarded-For entry, then the socket peer.
pub(crate) fn client_ip(headers: &HeaderMap, peer: Option<IpAddr>) -> Option<IpAddr> {
    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok());

    real_ip
        .or_else(|| {
            headers
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .and_then(|v| v.trim().parse().ok())
        })
        .or(peer)
}

/// First value of every header as a JSON object.
pub(crate) fn headers_json(headers: &HeaderMap) -> String {
    let map: serde_json::Map<String, serde_json::Value> = headers
        .keys()
        .filter_map(|name| {
            let value = headers.get(name)?;
            Some((
                name.as_str().to_string(),
                serde_json::Value::String(String::from_utf8_lossy(value.as_bytes()).into_owned()),
            ))
        })
        .collect();
    serde_json::Value::Object(map).to_string()
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> String {
    headers
        .get(name)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .unwrap_or_default()
}

fn content_length(headers: &HeaderMap) -> u64 {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

fn error_message(status: StatusCode) -> Option<String> {
    if !status.is_server_error() {
        return None;
    }
    Some(
        status
            .canonical_reason()
            .map_or_else(|| status.as_u16().to_string(), ToString::to_string),
    )
}
