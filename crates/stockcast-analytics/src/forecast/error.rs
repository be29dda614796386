//! 예측 모듈 에러 타입.

use thiserror::Error;

/// 예측 작업에서 발생할 수 있는 에러.
#[derive(Debug, Error)]
pub enum ForecastError {
    /// 모델 로드 에러
    #[error("Model load error: {0}")]
    ModelLoad(String),

    /// 모델 추론 중 에러
    #[error("Inference error: {0}")]
    Inference(String),

    /// 유효하지 않은 입력 데이터
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// 예측을 위한 데이터 부족
    #[error("有效数据不足（<{required}）: need {required} points, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// ONNX Runtime 에러
    #[error("ONNX Runtime error: {0}")]
    OnnxRuntime(String),

    /// 차트 렌더링 에러
    #[error("Render error: {0}")]
    Render(String),
}

/// 예측 작업을 위한 Result 타입.
pub type ForecastResult<T> = Result<T, ForecastError>;

impl ForecastError {
    /// 다른 입력으로 다시 시도하면 해결될 수 있는 에러인지 확인.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ForecastError::InsufficientData { .. } | ForecastError::InvalidInput(_)
        )
    }

    /// 모델 리로드가 필요한 에러인지 확인.
    pub fn requires_reload(&self) -> bool {
        matches!(
            self,
            ForecastError::ModelLoad(_) | ForecastError::OnnxRuntime(_)
        )
    }
}

#[cfg(feature = "ml")]
impl From<ort::Error> for ForecastError {
    fn from(err: ort::Error) -> Self {
        ForecastError::OnnxRuntime(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ForecastError {
    fn from(err: tokio::task::JoinError) -> Self {
        ForecastError::Inference(format!("blocking task failed: {}", err))
    }
}
