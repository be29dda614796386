//! 예측기 설정.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use stockcast_core::ModelConfig;

use super::error::{ForecastError, ForecastResult};
use super::types::QuantileLayout;

/// 예측 백엔드.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForecastBackend {
    /// ONNX 모델 (`ml` feature 필요)
    #[default]
    Onnx,
    /// 선형 추세 기반 기준 모델
    Drift,
}

impl ForecastBackend {
    /// 설정 문자열.
    pub fn as_str(&self) -> &'static str {
        match self {
            ForecastBackend::Onnx => "onnx",
            ForecastBackend::Drift => "drift",
        }
    }
}

impl std::str::FromStr for ForecastBackend {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "onnx" => Ok(ForecastBackend::Onnx),
            "drift" => Ok(ForecastBackend::Drift),
            other => Err(ForecastError::InvalidInput(format!(
                "unknown forecast backend: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for ForecastBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 예측기 설정.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecasterConfig {
    /// 백엔드
    pub backend: ForecastBackend,
    /// ONNX 모델 파일 경로
    pub model_path: PathBuf,
    /// 로깅/식별을 위한 모델 이름
    pub model_name: String,
    /// 모델에 넣을 최대 컨텍스트 길이
    pub max_context: usize,
    /// 최대 예측 길이
    pub max_horizon: usize,
    /// 입력 z-score 정규화
    pub normalize_inputs: bool,
    /// 입력이 모두 양수이면 출력을 0 이상으로 제한
    pub infer_is_positive: bool,
    /// 분위수 교차 보정
    pub fix_quantile_crossing: bool,
    /// 최소 유효 관측치 수
    pub min_points: usize,
    /// 분위수 출력 방향 (없으면 shape로 추정)
    pub quantile_layout: Option<QuantileLayout>,
}

impl Default for ForecasterConfig {
    fn default() -> Self {
        Self {
            backend: ForecastBackend::Onnx,
            model_path: PathBuf::from("models/timesfm-2.5-200m.onnx"),
            model_name: "timesfm-2.5-200m".to_string(),
            max_context: 1024,
            max_horizon: 256,
            normalize_inputs: true,
            infer_is_positive: true,
            fix_quantile_crossing: true,
            min_points: 10,
            quantile_layout: Some(QuantileLayout::HorizonMajor),
        }
    }
}

impl ForecasterConfig {
    /// 기준 모델 설정.
    pub fn drift() -> Self {
        Self {
            backend: ForecastBackend::Drift,
            model_name: "linear-drift".to_string(),
            ..Default::default()
        }
    }

    /// `[model]` 설정 섹션에서 생성합니다.
    pub fn from_model_config(config: &ModelConfig) -> ForecastResult<Self> {
        let quantile_layout = config
            .quantile_layout
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(str::parse)
            .transpose()?;

        Ok(Self {
            backend: config.backend.parse()?,
            model_path: PathBuf::from(&config.model_path),
            model_name: config.model_name.clone(),
            max_context: config.max_context.max(1),
            max_horizon: config.max_horizon.max(1),
            normalize_inputs: config.normalize_inputs,
            infer_is_positive: config.infer_is_positive,
            fix_quantile_crossing: config.fix_quantile_crossing,
            min_points: config.min_points.max(1),
            quantile_layout,
        })
    }

    /// 모델 이름 설정.
    pub fn with_model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = name.into();
        self
    }

    /// 최소 유효 관측치 수 설정.
    pub fn with_min_points(mut self, min_points: usize) -> Self {
        self.min_points = min_points;
        self
    }

    /// 최대 컨텍스트 길이 설정.
    pub fn with_max_context(mut self, max_context: usize) -> Self {
        self.max_context = max_context;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forecaster_config_default() {
        let config = ForecasterConfig::default();
        assert_eq!(config.max_context, 1024);
        assert_eq!(config.max_horizon, 256);
        assert_eq!(config.min_points, 10);
        assert!(config.normalize_inputs);
        assert!(config.infer_is_positive);
        assert!(config.fix_quantile_crossing);
    }

    #[test]
    fn test_from_model_config() {
        let model = ModelConfig {
            backend: "drift".to_string(),
            quantile_layout: Some("quantile_major".to_string()),
            ..Default::default()
        };
        let config = ForecasterConfig::from_model_config(&model).unwrap();
        assert_eq!(config.backend, ForecastBackend::Drift);
        assert_eq!(config.quantile_layout, Some(QuantileLayout::QuantileMajor));

        let model = ModelConfig {
            quantile_layout: None,
            ..Default::default()
        };
        let config = ForecasterConfig::from_model_config(&model).unwrap();
        assert_eq!(config.quantile_layout, None);
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let model = ModelConfig {
            backend: "torch".to_string(),
            ..Default::default()
        };
        assert!(ForecasterConfig::from_model_config(&model).is_err());
    }
}
