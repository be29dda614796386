//! 모델 입출력 전후 처리.
//!
//! 백엔드와 상관없이 같은 순서로 적용됩니다:
//! 컨텍스트 자르기 → 정규화 → 추론 → 역정규화 → 분위수 교차 보정 → 양수 제한

use tracing::debug;

use super::config::ForecasterConfig;
use super::error::{ForecastError, ForecastResult};
use super::predictor::Forecaster;
use super::types::RawForecast;

/// z-score 정규화기.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scaler {
    mean: f64,
    std: f64,
}

impl Scaler {
    /// 컨텍스트의 평균/표준편차로 생성합니다.
    pub fn fit(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::identity();
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = var.sqrt();
        Self {
            mean,
            std: if std > 1e-12 { std } else { 1.0 },
        }
    }

    /// 변환하지 않는 정규화기.
    pub fn identity() -> Self {
        Self { mean: 0.0, std: 1.0 }
    }

    pub fn normalize(&self, v: f64) -> f64 {
        (v - self.mean) / self.std
    }

    pub fn denormalize(&self, v: f64) -> f64 {
        v * self.std + self.mean
    }
}

/// 분위수 교차 보정.
pub fn fix_quantile_crossing(forecast: &mut RawForecast) {
    forecast.quantiles.fix_crossing();
}

/// 음수 값을 0으로 제한합니다.
pub fn clamp_non_negative(forecast: &mut RawForecast) {
    for v in &mut forecast.point {
        *v = v.max(0.0);
    }
    forecast.quantiles.map_values(|v| v.max(0.0));
}

/// 설정에 따른 전후 처리를 포함하여 예측기를 실행합니다.
pub fn run_forecaster(
    model: &mut dyn Forecaster,
    context: &[f64],
    horizon: usize,
    config: &ForecasterConfig,
) -> ForecastResult<RawForecast> {
    if context.is_empty() {
        return Err(ForecastError::InvalidInput("empty context".to_string()));
    }

    let start = context.len().saturating_sub(config.max_context.max(1));
    let context = &context[start..];

    let scaler = if config.normalize_inputs {
        Scaler::fit(context)
    } else {
        Scaler::identity()
    };
    let scaled: Vec<f64> = context.iter().map(|v| scaler.normalize(*v)).collect();

    let mut forecast = model.forecast(&scaled, horizon)?;
    forecast.validate(horizon)?;

    if config.normalize_inputs {
        for v in &mut forecast.point {
            *v = scaler.denormalize(*v);
        }
        forecast.quantiles.map_values(|v| scaler.denormalize(v));
    }

    if config.fix_quantile_crossing {
        fix_quantile_crossing(&mut forecast);
    }

    if config.infer_is_positive && context.iter().all(|v| *v > 0.0) {
        clamp_non_negative(&mut forecast);
    }

    if forecast.point.iter().any(|v| !v.is_finite()) {
        return Err(ForecastError::Inference(
            "model produced non-finite values".to_string(),
        ));
    }

    debug!(
        model = model.model_name(),
        context = context.len(),
        horizon,
        "예측 완료"
    );

    Ok(forecast)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::types::QuantileMatrix;

    /// 마지막 값을 그대로 반복하고 고정된 분위수를 내는 모델.
    struct EchoForecaster {
        offsets: Vec<f64>,
        seen: Vec<f64>,
    }

    impl Forecaster for EchoForecaster {
        fn forecast(&mut self, context: &[f64], horizon: usize) -> ForecastResult<RawForecast> {
            self.seen = context.to_vec();
            let last = *context.last().unwrap_or(&0.0);
            let point = vec![last; horizon];
            let channels: Vec<Vec<f64>> = self
                .offsets
                .iter()
                .map(|o| vec![last + o; horizon])
                .collect();
            Ok(RawForecast {
                point,
                quantiles: QuantileMatrix::from_channels(&channels, false)?,
            })
        }

        fn model_name(&self) -> &str {
            "echo"
        }
    }

    #[test]
    fn test_scaler_roundtrip_and_constant_series() {
        let s = Scaler::fit(&[1.0, 2.0, 3.0]);
        assert!((s.denormalize(s.normalize(2.5)) - 2.5).abs() < 1e-12);

        let flat = Scaler::fit(&[5.0, 5.0]);
        assert_eq!(flat.normalize(5.0), 0.0);
    }

    #[test]
    fn test_crossing_fixed_and_denormalized() {
        let mut model = EchoForecaster {
            offsets: vec![1.0, -1.0],
            seen: Vec::new(),
        };
        let config = ForecasterConfig::drift();
        let out = run_forecaster(&mut model, &[10.0, 11.0, 12.0], 2, &config).unwrap();

        assert!((out.point[0] - 12.0).abs() < 1e-9);
        let band = out.quantiles.band();
        assert!(band.lower[0] < band.upper[0]);
        // 모델은 정규화된 컨텍스트를 받음
        assert!(model.seen.iter().sum::<f64>().abs() < 1e-9);
    }

    #[test]
    fn test_positive_clamp() {
        let mut model = EchoForecaster {
            offsets: vec![-100.0, 100.0],
            seen: Vec::new(),
        };
        let config = ForecasterConfig {
            normalize_inputs: false,
            ..ForecasterConfig::drift()
        };
        let out = run_forecaster(&mut model, &[1.0, 2.0], 1, &config).unwrap();
        assert_eq!(out.quantiles.band().lower, vec![0.0]);

        // 음수가 섞인 컨텍스트는 제한하지 않음
        let out = run_forecaster(&mut model, &[-1.0, 2.0], 1, &config).unwrap();
        assert_eq!(out.quantiles.band().lower, vec![-98.0]);
    }

    #[test]
    fn test_context_truncated_to_max_context() {
        let mut model = EchoForecaster {
            offsets: vec![0.0],
            seen: Vec::new(),
        };
        let config = ForecasterConfig {
            normalize_inputs: false,
            ..ForecasterConfig::drift().with_max_context(3)
        };
        run_forecaster(&mut model, &[1.0, 2.0, 3.0, 4.0, 5.0], 1, &config).unwrap();
        assert_eq!(model.seen, vec![3.0, 4.0, 5.0]);
    }
}
