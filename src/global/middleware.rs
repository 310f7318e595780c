//! 요청 추적 미들웨어
//!
//! 요청마다 ID 를 붙여 span 을 만들고 요청 수와 처리 시간을 기록합니다.

use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

/// Request ID header name for distributed tracing
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// 요청 ID 를 발급하고 span 안에서 요청을 처리합니다.
///
/// 클라이언트가 보낸 `x-request-id` 가 있으면 그대로 사용하고 응답 헤더에도 싣습니다.
pub async fn request_tracing(request: Request<Body>, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let span = tracing::info_span!(
        "http_request",
        request_id = %request_id,
        method = %method,
        path = %path,
    );

    async move {
        tracing::info!("Request started");
        let start = Instant::now();

        let mut response = next.run(request).await;

        let duration = start.elapsed();
        let status = response.status();
        tracing::info!(
            status = status.as_u16(),
            duration_ms = duration.as_millis() as u64,
            "Request completed"
        );

        record_request_metrics(method.as_str(), &path, status.as_u16(), duration);

        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response
                .headers_mut()
                .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
        }
        response
    }
    .instrument(span)
    .await
}

fn record_request_metrics(method: &str, path: &str, status: u16, duration: Duration) {
    let path = normalize_path(path);
    let status = status.to_string();

    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.clone(),
        "status" => status.clone()
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path,
        "status" => status
    )
    .record(duration.as_secs_f64());
}

/// 숫자 경로 세그먼트를 `:id` 로 바꿔 라벨 카디널리티를 제한합니다.
fn normalize_path(path: &str) -> String {
    if path == "/" {
        return path.to_string();
    }

    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            if segment.chars().all(|c| c.is_ascii_digit() || c == '-') {
                ":id"
            } else {
                segment
            }
        })
        .fold(String::new(), |mut acc, segment| {
            acc.push('/');
            acc.push_str(segment);
            acc
        })
}
