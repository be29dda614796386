//! 통합 API 에러 응답 타입.
//!
//! JSON 엔드포인트는 모두 같은 에러 형식을 사용합니다. 프론트엔드는
//! `error` 필드를 그대로 화면에 표시합니다.

use axum::http::{Method, StatusCode, Uri};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{error, warn};

use stockcast_analytics::ForecastError;
use stockcast_core::CoreError;
use stockcast_data::DataError;

/// 통합 API 에러 응답.
///
/// # 예시
///
/// ```json
/// {
///   "code": "INSUFFICIENT_DATA",
///   "error": "有效数据不足（<10）: need 10 points, got 4",
///   "timestamp": 1738300800,
///   "method": "POST",
///   "path": "/api/predict"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// 에러 코드 (예: "INVALID_INPUT", "DATA_UNAVAILABLE")
    pub code: String,
    /// 사람이 읽을 수 있는 에러 메시지
    #[serde(rename = "error")]
    pub message: String,
    /// 추가 에러 상세 정보 (선택적)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// 에러 발생 타임스탬프 (Unix timestamp, 선택적)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    /// HTTP 메서드
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// 요청 경로
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ApiErrorResponse {
    /// 기본 에러 생성 (타임스탬프 포함).
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            timestamp: Some(chrono::Utc::now().timestamp()),
            method: None,
            path: None,
        }
    }

    /// 상세 정보 포함 에러 생성.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Value,
    ) -> Self {
        Self {
            details: Some(details),
            ..Self::new(code, message)
        }
    }

    /// 요청 정보(메서드, 경로)를 추가합니다.
    #[must_use]
    pub fn with_request_info(mut self, method: &Method, uri: &Uri) -> Self {
        self.method = Some(method.to_string());
        self.path = Some(uri.path().to_string());
        self
    }

    /// 에러 코드 반환.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// 에러 메시지 반환.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ApiErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiErrorResponse {}

/// API 핸들러 Result 타입 별칭.
pub type ApiResult<T> = Result<T, (StatusCode, Json<ApiErrorResponse>)>;

/// 요청 처리 중 발생한 에러.
///
/// 각 크레이트의 에러를 요청 경계에서 하나로 모읍니다.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Forecast(#[from] ForecastError),

    /// 요청 본문/파라미터 문제
    #[error("{0}")]
    BadRequest(String),
}

impl AppError {
    /// HTTP 상태 코드.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Core(CoreError::Config(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Core(_) => StatusCode::BAD_REQUEST,
            AppError::Data(e) => match e {
                DataError::EmptyResult { .. } | DataError::DataFormat(_) | DataError::Parse(_) => {
                    StatusCode::BAD_REQUEST
                }
                DataError::Request(_) => StatusCode::INTERNAL_SERVER_ERROR,
                DataError::DataUnavailable { .. }
                | DataError::Transport(_)
                | DataError::Timeout(_)
                | DataError::Http { .. } => StatusCode::BAD_GATEWAY,
            },
            AppError::Forecast(e) => match e {
                ForecastError::InvalidInput(_) | ForecastError::InsufficientData { .. } => {
                    StatusCode::BAD_REQUEST
                }
                ForecastError::ModelLoad(_) | ForecastError::OnnxRuntime(_) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                ForecastError::Inference(_) | ForecastError::Render(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    /// 에러 코드.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "INVALID_INPUT",
            AppError::Core(CoreError::Config(_)) => "CONFIG_ERROR",
            AppError::Core(_) => "INVALID_INPUT",
            AppError::Data(e) => match e {
                DataError::DataUnavailable { .. } => "DATA_UNAVAILABLE",
                DataError::EmptyResult { .. } => "EMPTY_RESULT",
                DataError::DataFormat(_) | DataError::Parse(_) => "DATA_FORMAT",
                DataError::Request(_) => "REQUEST_ERROR",
                DataError::Transport(_) | DataError::Timeout(_) | DataError::Http { .. } => {
                    "UPSTREAM_ERROR"
                }
            },
            AppError::Forecast(e) => match e {
                ForecastError::InvalidInput(_) => "INVALID_INPUT",
                ForecastError::InsufficientData { .. } => "INSUFFICIENT_DATA",
                ForecastError::ModelLoad(_) | ForecastError::OnnxRuntime(_) => "MODEL_LOAD",
                ForecastError::Inference(_) => "INFERENCE_ERROR",
                ForecastError::Render(_) => "RENDER_ERROR",
            },
        }
    }

    /// 응답 본문 밖에서 처리한 에러(페이지, SSE)를 기록합니다.
    pub fn log(&self, route: &str) {
        if self.status().is_server_error() {
            error!(code = self.code(), route, error = %self, "요청 처리 실패");
        } else {
            warn!(code = self.code(), route, error = %self, "잘못된 요청");
        }
    }

    /// 로그를 남기고 JSON 에러 응답으로 변환합니다.
    pub fn into_response_parts(
        self,
        method: &Method,
        uri: &Uri,
    ) -> (StatusCode, Json<ApiErrorResponse>) {
        let status = self.status();
        if status.is_server_error() {
            error!(code = self.code(), %method, path = uri.path(), error = %self, "요청 처리 실패");
        } else {
            warn!(code = self.code(), %method, path = uri.path(), error = %self, "잘못된 요청");
        }

        let body = ApiErrorResponse::new(self.code(), self.to_string())
            .with_request_info(method, uri);
        (status, Json(body))
    }
}
