//! Prometheus 메트릭 설정 및 유틸리티.
//!
//! HTTP 요청 메트릭과 수집/예측 메트릭을 기록하고 `/metrics` 엔드포인트로
//! 노출합니다.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

/// 메트릭 라벨로 쓰는 알려진 경로.
const KNOWN_PATHS: [&str; 7] = [
    "/",
    "/fetch_stream",
    "/api/fetch",
    "/api/predict",
    "/health",
    "/health/ready",
    "/metrics",
];

/// Prometheus 메트릭 레코더를 설정하고 핸들을 반환합니다.
///
/// # Errors
///
/// 레코더가 이미 설치되어 있으면 에러를 반환합니다.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
        )?
        // 예측은 모델 로드를 포함하면 수십 초까지 걸립니다
        .set_buckets_for_metric(
            Matcher::Full("stockcast_forecast_duration_seconds".to_string()),
            &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0],
        )?
        .install_recorder()
}

// ============================================================================
// HTTP 메트릭
// ============================================================================

/// HTTP 요청 카운터 증가.
pub fn record_http_request(method: &str, path: &str) {
    counter!("http_requests_total", "method" => method.to_string(), "path" => path.to_string())
        .increment(1);
}

/// HTTP 응답 카운터 증가.
pub fn record_http_response(method: &str, path: &str, status: u16) {
    counter!(
        "http_responses_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// HTTP 요청 지속 시간 기록.
pub fn record_http_duration(method: &str, path: &str, duration_secs: f64) {
    histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_secs);
}

// ============================================================================
// 수집/예측 메트릭
// ============================================================================

/// 분봉 수집 결과 카운터 증가 (`ok` | `fallback` | 에러 코드).
pub fn record_fetch(outcome: &str) {
    counter!("stockcast_fetch_total", "outcome" => outcome.to_string()).increment(1);
}

/// 수집 재시도 횟수 누적.
pub fn record_fetch_retries(retries: usize) {
    if retries > 0 {
        counter!("stockcast_fetch_retries_total").increment(retries as u64);
    }
}

/// 예측 결과와 소요 시간 기록.
pub fn record_forecast(model: &str, outcome: &str, duration_secs: f64) {
    counter!("stockcast_forecast_total", "outcome" => outcome.to_string()).increment(1);
    histogram!("stockcast_forecast_duration_seconds", "model" => model.to_string())
        .record(duration_secs);
}

// ============================================================================
// 경로 정규화
// ============================================================================

/// 라벨 카디널리티를 제한하기 위해 알 수 없는 경로를 하나로 묶습니다.
///
/// 끝의 `/`는 무시합니다. 예: `/api/fetch/` → `/api/fetch`, `/wp-admin` → `/other`
pub fn normalize_path(path: &str) -> String {
    let trimmed = if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    };
    let trimmed = if trimmed.is_empty() { "/" } else { trimmed };

    if KNOWN_PATHS.contains(&trimmed) {
        trimmed.to_string()
    } else {
        "/other".to_string()
    }
}
