//! 종가 시계열 예측.
//!
//! - `predictor`: 예측기 trait와 백엔드 (선형 추세, ONNX)
//! - `postprocess`: 정규화, 분위수 교차 보정, 양수 제한
//! - `service`: 지연 로드 + 직렬화된 추론
//! - `horizon`, `summary`: 예측 길이 결정과 요약 통계

pub mod config;
pub mod error;
pub mod horizon;
pub mod loader;
pub mod postprocess;
pub mod predictor;
pub mod service;
pub mod summary;
pub mod types;

pub use config::{ForecastBackend, ForecasterConfig};
pub use error::{ForecastError, ForecastResult};
pub use horizon::{resolve_horizon, HorizonPlan, NEXT_TRADING_DAYS};
pub use loader::{BackendLoader, ModelLoader};
pub use postprocess::{run_forecaster, Scaler};
pub use predictor::{DriftForecaster, Forecaster};
pub use service::{ForecastOutcome, ForecastService};
pub use summary::{ForecastSummary, Trend};
pub use types::{ForecastBand, QuantileLayout, QuantileMatrix, RawForecast};

#[cfg(feature = "ml")]
pub use predictor::OnnxForecaster;
