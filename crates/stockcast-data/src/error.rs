//! 데이터 수집 오류 타입.

use stockcast_core::{Adjust, BarPeriod};
use thiserror::Error;

/// 데이터 수집 관련 오류.
#[derive(Debug, Error)]
pub enum DataError {
    /// 연결/TLS/본문 수신 실패 (일시적)
    #[error("Transport error: {0}")]
    Transport(String),

    /// 요청 타임아웃 (일시적)
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// 업스트림이 실패 상태 코드를 반환
    #[error("HTTP error [{status}]: {message}")]
    Http { status: u16, message: String },

    /// 요청을 만들 수 없음 (잘못된 URL 등)
    #[error("Invalid request: {0}")]
    Request(String),

    /// 재시도와 폴백이 모두 실패
    #[error("网络连接问题，无法获取数据：{symbol}。请检查网络连接或稍后重试。")]
    DataUnavailable { symbol: String },

    /// 업스트림이 빈 결과를 반환
    #[error("无法获取数据：{symbol}，周期{period}分钟，{label}", label = .adjust.label())]
    EmptyResult {
        symbol: String,
        period: BarPeriod,
        adjust: Adjust,
    },

    /// 응답 형식이 예상과 다름
    #[error("Unexpected data format: {0}")]
    DataFormat(String),

    /// 값 파싱 실패
    #[error("Parse error: {0}")]
    Parse(String),
}

impl DataError {
    /// 재시도할 가치가 있는 일시적 오류인지 확인합니다.
    pub fn is_transient(&self) -> bool {
        matches!(self, DataError::Transport(_) | DataError::Timeout(_))
    }

    /// 사용자 입력/업스트림 데이터 문제인지 확인합니다.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            DataError::EmptyResult { .. } | DataError::DataFormat(_) | DataError::Parse(_)
        )
    }
}

impl From<reqwest::Error> for DataError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DataError::Timeout(err.to_string())
        } else if err.is_builder() {
            DataError::Request(err.to_string())
        } else if let Some(status) = err.status() {
            DataError::Http {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else if err.is_decode() {
            DataError::DataFormat(err.to_string())
        } else {
            // connect, body, redirect 등 전송 계층 실패
            DataError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        DataError::DataFormat(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
