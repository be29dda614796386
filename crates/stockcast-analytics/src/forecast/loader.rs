//! 예측기 로더.

use tracing::info;

use super::config::{ForecastBackend, ForecasterConfig};
use super::error::ForecastResult;
use super::predictor::{DriftForecaster, Forecaster};

/// 설정으로 예측기를 만드는 로더.
///
/// 로드는 블로킹 스레드에서 실행됩니다.
pub trait ModelLoader: Send + Sync {
    /// 예측기를 로드합니다.
    fn load(&self, config: &ForecasterConfig) -> ForecastResult<Box<dyn Forecaster>>;
}

/// `backend` 설정에 따라 예측기를 고르는 기본 로더.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackendLoader;

impl ModelLoader for BackendLoader {
    fn load(&self, config: &ForecasterConfig) -> ForecastResult<Box<dyn Forecaster>> {
        info!(backend = %config.backend, model = %config.model_name, "예측 모델 로드");

        match config.backend {
            ForecastBackend::Drift => Ok(Box::new(DriftForecaster::new(&config.model_name))),
            ForecastBackend::Onnx => load_onnx(config),
        }
    }
}

#[cfg(feature = "ml")]
fn load_onnx(config: &ForecasterConfig) -> ForecastResult<Box<dyn Forecaster>> {
    let model = super::predictor::OnnxForecaster::load(config)?;
    Ok(Box::new(model))
}

#[cfg(not(feature = "ml"))]
fn load_onnx(_config: &ForecasterConfig) -> ForecastResult<Box<dyn Forecaster>> {
    Err(super::error::ForecastError::ModelLoad(
        "ONNX backend requires building with the `ml` feature".to_string(),
    ))
}
