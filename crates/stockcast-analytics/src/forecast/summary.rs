//! 예측 요약 통계.
//!
//! 모든 변화율은 현재가(컨텍스트 마지막 값) 대비 백분율입니다.

use serde::{Serialize, Serializer};
use std::fmt;

use super::error::{ForecastError, ForecastResult};
use super::types::ForecastBand;

/// 예측 추세.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl Trend {
    /// 화면 표시 이름.
    pub fn label(&self) -> &'static str {
        match self {
            Trend::Up => "上升",
            Trend::Down => "下降",
            Trend::Flat => "持平",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Trend {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// 예측 요약.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastSummary {
    /// 현재가
    pub current_price: f64,
    /// 시점별 변화율 (%)
    pub pct_changes: Vec<f64>,
    pub trend: Trend,
    /// 변화율의 모표준편차 (%)
    pub volatility: f64,
    /// 최대 상승률 (%)
    pub max_gain: f64,
    /// 최대 하락률 (%)
    pub max_loss: f64,
    /// 밴드 상한의 최고가
    pub upper_price: f64,
    /// 밴드 하한의 최저가
    pub lower_price: f64,
}

impl ForecastSummary {
    /// 점 예측과 밴드로 요약을 계산합니다.
    pub fn compute(current: f64, point: &[f64], band: &ForecastBand) -> ForecastResult<Self> {
        if !current.is_finite() || current <= 0.0 {
            return Err(ForecastError::InvalidInput(format!(
                "current price must be positive, got {}",
                current
            )));
        }
        if point.is_empty() {
            return Err(ForecastError::InvalidInput(
                "empty point forecast".to_string(),
            ));
        }

        let pct_changes: Vec<f64> = point
            .iter()
            .map(|p| (p - current) / current * 100.0)
            .collect();

        // 한 시점뿐이면 현재가(0%)와 비교
        let (first, last) = match pct_changes.as_slice() {
            [only] => (0.0, *only),
            [first, .., last] => (*first, *last),
            [] => (0.0, 0.0),
        };
        let trend = if last > first {
            Trend::Up
        } else if last < first {
            Trend::Down
        } else {
            Trend::Flat
        };

        let n = pct_changes.len() as f64;
        let mean = pct_changes.iter().sum::<f64>() / n;
        let volatility = (pct_changes.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();

        let max_gain = pct_changes.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let max_loss = pct_changes.iter().copied().fold(f64::INFINITY, f64::min);

        let upper_price = band
            .upper
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let lower_price = band.lower.iter().copied().fold(f64::INFINITY, f64::min);

        Ok(Self {
            current_price: current,
            pct_changes,
            trend,
            volatility,
            max_gain,
            max_loss,
            upper_price: if upper_price.is_finite() { upper_price } else { current },
            lower_price: if lower_price.is_finite() { lower_price } else { current },
        })
    }

    /// 최대 상승률에 해당하는 가격.
    pub fn gain_price(&self) -> f64 {
        self.current_price * (1.0 + self.max_gain / 100.0)
    }

    /// 최대 하락률에 해당하는 가격.
    pub fn loss_price(&self) -> f64 {
        self.current_price * (1.0 + self.max_loss / 100.0)
    }
}
