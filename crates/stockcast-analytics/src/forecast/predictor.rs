//! 시계열 예측기.
//!
//! - [`DriftForecaster`]: 최소제곱 선형 추세 + 잔차 기반 분위수. 항상 사용 가능
//! - `OnnxForecaster`: 사전 학습된 ONNX 모델 (`ml` feature)
//!
//! 예측기는 정규화 등 전후 처리를 직접 하지 않습니다.
//! [`run_forecaster`](super::postprocess::run_forecaster)가 담당합니다.

use super::error::{ForecastError, ForecastResult};
use super::types::{QuantileLayout, QuantileMatrix, RawForecast};

/// 다형성을 가능하게 하는 예측기 trait.
///
/// 추론은 내부 상태를 바꿀 수 있으므로 `&mut self`를 받습니다.
/// 동시 호출 직렬화는 호출자(서비스)의 책임입니다.
pub trait Forecaster: Send {
    /// `context` 다음 `horizon` 시점을 예측합니다.
    fn forecast(&mut self, context: &[f64], horizon: usize) -> ForecastResult<RawForecast>;

    /// 모델 이름 반환.
    fn model_name(&self) -> &str;
}

/// 분위수 수준 0.1 ~ 0.9에 대응하는 표준정규 z 값.
const QUANTILE_Z: [f64; 9] = [
    -1.281_551_565_544_600_4,
    -0.841_621_233_572_914_3,
    -0.524_400_512_708_040_7,
    -0.253_347_103_135_799_7,
    0.0,
    0.253_347_103_135_799_7,
    0.524_400_512_708_040_7,
    0.841_621_233_572_914_3,
    1.281_551_565_544_600_4,
];

/// 선형 추세 기준 예측기.
///
/// 컨텍스트 전체에 최소제곱 직선을 맞추고 추세를 연장합니다.
/// 분위수는 잔차 표준편차에 `√step`을 곱해 z 값만큼 벌립니다.
/// 출력은 평균 채널 + 분위수 9개, horizon-major 배치입니다.
#[derive(Debug, Clone)]
pub struct DriftForecaster {
    name: String,
}

impl DriftForecaster {
    /// 새 예측기 생성.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// (기울기, 절편, 잔차 표준편차)
    fn fit(context: &[f64]) -> (f64, f64, f64) {
        let n = context.len() as f64;
        if context.len() < 2 {
            return (0.0, context.first().copied().unwrap_or(0.0), 0.0);
        }

        let x_mean = (n - 1.0) / 2.0;
        let y_mean = context.iter().sum::<f64>() / n;

        let mut sxy = 0.0;
        let mut sxx = 0.0;
        for (i, y) in context.iter().enumerate() {
            let dx = i as f64 - x_mean;
            sxy += dx * (y - y_mean);
            sxx += dx * dx;
        }
        let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
        let intercept = y_mean - slope * x_mean;

        let rss = context
            .iter()
            .enumerate()
            .map(|(i, y)| (y - (intercept + slope * i as f64)).powi(2))
            .sum::<f64>();
        let sigma = (rss / n).sqrt();

        (slope, intercept, sigma)
    }
}

impl Default for DriftForecaster {
    fn default() -> Self {
        Self::new("linear-drift")
    }
}

impl Forecaster for DriftForecaster {
    fn forecast(&mut self, context: &[f64], horizon: usize) -> ForecastResult<RawForecast> {
        if context.is_empty() {
            return Err(ForecastError::InvalidInput("empty context".to_string()));
        }
        if horizon == 0 {
            return Err(ForecastError::InvalidInput("horizon must be >= 1".to_string()));
        }

        let (slope, intercept, sigma) = Self::fit(context);
        let last_x = (context.len() - 1) as f64;

        let point: Vec<f64> = (1..=horizon)
            .map(|step| intercept + slope * (last_x + step as f64))
            .collect();

        let mut values = Vec::with_capacity(horizon * (QUANTILE_Z.len() + 1));
        for (i, p) in point.iter().enumerate() {
            let spread = sigma * ((i + 1) as f64).sqrt();
            values.push(*p);
            values.extend(QUANTILE_Z.iter().map(|z| p + z * spread));
        }

        let quantiles = QuantileMatrix::new(
            values,
            horizon,
            QUANTILE_Z.len() + 1,
            QuantileLayout::HorizonMajor,
            true,
        )?;

        Ok(RawForecast { point, quantiles })
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}

#[cfg(feature = "ml")]
pub use onnx::OnnxForecaster;

#[cfg(feature = "ml")]
mod onnx {
    use ort::session::{builder::GraphOptimizationLevel, Session};
    use tracing::{debug, info};

    use super::Forecaster;
    use crate::forecast::config::ForecasterConfig;
    use crate::forecast::error::{ForecastError, ForecastResult};
    use crate::forecast::types::{QuantileLayout, QuantileMatrix, RawForecast};

    /// 모델 입력 이름.
    const INPUT_NAME: &str = "inputs";

    /// ONNX 기반 시계열 예측기.
    ///
    /// 모델은 다음을 가져야 합니다:
    /// - 입력: `[1, context]` float32 텐서
    /// - 출력: 점 예측 `[1, H]`, 분위수 `[1, H, Q]` (또는 `[1, Q, H]`)
    ///
    /// 분위수의 첫 채널은 평균입니다. 모델의 고정 출력 길이 H가 요청보다 길면
    /// 앞부분만 사용합니다.
    pub struct OnnxForecaster {
        session: Session,
        name: String,
        layout: Option<QuantileLayout>,
    }

    impl OnnxForecaster {
        /// 지정된 경로에서 ONNX 모델 로드.
        pub fn load(config: &ForecasterConfig) -> ForecastResult<Self> {
            let path = &config.model_path;

            if !path.exists() {
                return Err(ForecastError::ModelLoad(format!(
                    "Model file not found: {}",
                    path.display()
                )));
            }

            info!(path = %path.display(), "Loading ONNX model");

            let session = Session::builder()
                .map_err(|e| {
                    ForecastError::ModelLoad(format!("Failed to create session builder: {}", e))
                })?
                .with_optimization_level(GraphOptimizationLevel::Level3)
                .map_err(|e| {
                    ForecastError::ModelLoad(format!("Failed to set optimization level: {}", e))
                })?
                .commit_from_file(path)
                .map_err(|e| ForecastError::ModelLoad(format!("Failed to load model: {}", e)))?;

            info!(model = %config.model_name, "ONNX model loaded");

            Ok(Self {
                session,
                name: config.model_name.clone(),
                layout: config.quantile_layout,
            })
        }
    }

    impl Forecaster for OnnxForecaster {
        fn forecast(&mut self, context: &[f64], horizon: usize) -> ForecastResult<RawForecast> {
            let input: Vec<f32> = context.iter().map(|v| *v as f32).collect();
            let shape = [1i64, input.len() as i64];

            let tensor = ort::value::Tensor::from_array((shape, input.into_boxed_slice()))
                .map_err(|e| {
                    ForecastError::Inference(format!("Failed to create input tensor: {}", e))
                })?;

            let outputs = self
                .session
                .run(ort::inputs![INPUT_NAME => tensor])
                .map_err(|e| ForecastError::Inference(format!("Inference failed: {}", e)))?;

            // 출력은 차원 수로 구분: 2차원 = 점 예측, 3차원 = 분위수
            let mut point: Option<Vec<f64>> = None;
            let mut quantiles: Option<(Vec<f64>, usize, usize)> = None;
            for (name, value) in outputs.iter() {
                let (dims, data) = value.try_extract_tensor::<f32>().map_err(|e| {
                    ForecastError::Inference(format!("Failed to extract `{}`: {}", name, e))
                })?;
                let data: Vec<f64> = data.iter().map(|v| f64::from(*v)).collect();
                match dims.len() {
                    2 if point.is_none() => point = Some(data),
                    3 if quantiles.is_none() => {
                        quantiles = Some((data, dims[1] as usize, dims[2] as usize))
                    }
                    _ => debug!(output = %name, dims = dims.len(), "Ignoring model output"),
                }
            }
            drop(outputs);

            let point =
                point.ok_or_else(|| ForecastError::Inference("No point output".to_string()))?;
            let (values, rows, cols) = quantiles
                .ok_or_else(|| ForecastError::Inference("No quantile output".to_string()))?;

            if point.len() < horizon {
                return Err(ForecastError::Inference(format!(
                    "model horizon {} is shorter than requested {}",
                    point.len(),
                    horizon
                )));
            }

            let matrix = match self.layout {
                Some(layout) => QuantileMatrix::new(values, rows, cols, layout, true)?,
                None => QuantileMatrix::from_shape(values, rows, cols, point.len(), true)?,
            };

            Ok(RawForecast {
                point: point[..horizon].to_vec(),
                quantiles: matrix.truncate_horizon(horizon)?,
            })
        }

        fn model_name(&self) -> &str {
            &self.name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drift_output_shape() {
        let mut model = DriftForecaster::default();
        let context: Vec<f64> = (1..=10).map(f64::from).collect();
        let out = model.forecast(&context, 5).unwrap();

        assert_eq!(out.point.len(), 5);
        assert_eq!(out.quantiles.horizon(), 5);
        assert_eq!(out.quantiles.channels(), 10);
        assert!(out.quantiles.has_mean_channel());
    }

    #[test]
    fn test_drift_extends_linear_trend() {
        let mut model = DriftForecaster::default();
        let context: Vec<f64> = (1..=10).map(f64::from).collect();
        let out = model.forecast(&context, 3).unwrap();

        for (i, p) in out.point.iter().enumerate() {
            assert!((p - (11.0 + i as f64)).abs() < 1e-9);
        }
        // 잔차가 없으면 밴드는 점 예측과 같음
        let band = out.quantiles.band();
        assert!((band.upper[0] - out.point[0]).abs() < 1e-9);
    }

    #[test]
    fn test_drift_band_widens_with_step() {
        let mut model = DriftForecaster::default();
        let context = [10.0, 10.4, 9.8, 10.6, 10.1, 10.9, 10.3, 11.0, 10.6, 11.2];
        let out = model.forecast(&context, 4).unwrap();
        let band = out.quantiles.band();

        let width = |i: usize| band.upper[i] - band.lower[i];
        assert!(width(0) > 0.0);
        assert!(width(3) > width(0));
        assert!(band.lower.iter().zip(&out.point).all(|(l, p)| l < p));
    }

    #[test]
    fn test_drift_rejects_zero_horizon() {
        let mut model = DriftForecaster::default();
        assert!(model.forecast(&[1.0, 2.0], 0).is_err());
        assert!(model.forecast(&[], 3).is_err());
    }

    #[test]
    fn test_drift_single_point_is_flat() {
        let mut model = DriftForecaster::default();
        let out = model.forecast(&[7.0], 2).unwrap();
        assert_eq!(out.point, vec![7.0, 7.0]);
    }
}
