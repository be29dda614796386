//! 예측 결과 타입.

use serde::{Deserialize, Serialize};

use super::error::{ForecastError, ForecastResult};

/// 분위수 행렬의 배치 방향.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantileLayout {
    /// `(horizon, quantiles)`
    HorizonMajor,
    /// `(quantiles, horizon)`
    QuantileMajor,
}

impl QuantileLayout {
    /// 모델이 방향을 알려주지 않을 때 shape로 추정합니다.
    ///
    /// 행 수가 예측 길이와 같으면 horizon-major로 봅니다.
    pub fn detect(rows: usize, _cols: usize, horizon: usize) -> Self {
        if rows == horizon {
            QuantileLayout::HorizonMajor
        } else {
            QuantileLayout::QuantileMajor
        }
    }
}

impl std::str::FromStr for QuantileLayout {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "horizon_major" | "horizon" => Ok(QuantileLayout::HorizonMajor),
            "quantile_major" | "quantile" => Ok(QuantileLayout::QuantileMajor),
            other => Err(ForecastError::InvalidInput(format!(
                "unknown quantile layout: {}",
                other
            ))),
        }
    }
}

/// 모델이 반환한 분위수 출력.
///
/// `has_mean_channel`이면 첫 채널은 분위수가 아니라 평균이며
/// 밴드 계산에서 제외됩니다.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantileMatrix {
    values: Vec<f64>,
    rows: usize,
    cols: usize,
    layout: QuantileLayout,
    has_mean_channel: bool,
}

impl QuantileMatrix {
    /// 행 우선(row-major) 값으로 행렬을 생성합니다.
    pub fn new(
        values: Vec<f64>,
        rows: usize,
        cols: usize,
        layout: QuantileLayout,
        has_mean_channel: bool,
    ) -> ForecastResult<Self> {
        if values.len() != rows * cols {
            return Err(ForecastError::InvalidInput(format!(
                "quantile matrix has {} values, expected {}x{}",
                values.len(),
                rows,
                cols
            )));
        }

        let matrix = Self {
            values,
            rows,
            cols,
            layout,
            has_mean_channel,
        };
        if matrix.channels() <= matrix.first_quantile_channel() {
            return Err(ForecastError::InvalidInput(
                "quantile matrix has no quantile channel".to_string(),
            ));
        }
        Ok(matrix)
    }

    /// 방향을 shape로 추정하여 생성합니다.
    pub fn from_shape(
        values: Vec<f64>,
        rows: usize,
        cols: usize,
        horizon: usize,
        has_mean_channel: bool,
    ) -> ForecastResult<Self> {
        let layout = QuantileLayout::detect(rows, cols, horizon);
        Self::new(values, rows, cols, layout, has_mean_channel)
    }

    /// 채널별 시계열로 생성합니다 (horizon-major로 저장).
    pub fn from_channels(channels: &[Vec<f64>], has_mean_channel: bool) -> ForecastResult<Self> {
        let horizon = channels.first().map(Vec::len).unwrap_or(0);
        if channels.iter().any(|c| c.len() != horizon) {
            return Err(ForecastError::InvalidInput(
                "quantile channels differ in length".to_string(),
            ));
        }

        let mut values = Vec::with_capacity(horizon * channels.len());
        for step in 0..horizon {
            values.extend(channels.iter().map(|c| c[step]));
        }
        Self::new(
            values,
            horizon,
            channels.len(),
            QuantileLayout::HorizonMajor,
            has_mean_channel,
        )
    }

    /// 배치 방향.
    pub fn layout(&self) -> QuantileLayout {
        self.layout
    }

    /// 평균 채널 포함 여부.
    pub fn has_mean_channel(&self) -> bool {
        self.has_mean_channel
    }

    /// 예측 길이.
    pub fn horizon(&self) -> usize {
        match self.layout {
            QuantileLayout::HorizonMajor => self.rows,
            QuantileLayout::QuantileMajor => self.cols,
        }
    }

    /// 채널 수 (평균 채널 포함).
    pub fn channels(&self) -> usize {
        match self.layout {
            QuantileLayout::HorizonMajor => self.cols,
            QuantileLayout::QuantileMajor => self.rows,
        }
    }

    fn first_quantile_channel(&self) -> usize {
        usize::from(self.has_mean_channel)
    }

    /// `step`, `channel` 위치의 값.
    pub fn value(&self, step: usize, channel: usize) -> f64 {
        match self.layout {
            QuantileLayout::HorizonMajor => self.values[step * self.cols + channel],
            QuantileLayout::QuantileMajor => self.values[channel * self.cols + step],
        }
    }

    fn value_mut(&mut self, step: usize, channel: usize) -> &mut f64 {
        match self.layout {
            QuantileLayout::HorizonMajor => &mut self.values[step * self.cols + channel],
            QuantileLayout::QuantileMajor => &mut self.values[channel * self.cols + step],
        }
    }

    /// 채널 하나의 시계열.
    pub fn channel(&self, channel: usize) -> Vec<f64> {
        (0..self.horizon()).map(|s| self.value(s, channel)).collect()
    }

    /// 가장 낮은 분위수 시계열.
    pub fn lower_trace(&self) -> Vec<f64> {
        self.channel(self.first_quantile_channel())
    }

    /// 가장 높은 분위수 시계열.
    pub fn upper_trace(&self) -> Vec<f64> {
        self.channel(self.channels() - 1)
    }

    /// 하한/상한 밴드.
    pub fn band(&self) -> ForecastBand {
        ForecastBand {
            lower: self.lower_trace(),
            upper: self.upper_trace(),
        }
    }

    /// 모든 값에 함수를 적용합니다.
    pub fn map_values<F: Fn(f64) -> f64>(&mut self, f: F) {
        for v in &mut self.values {
            *v = f(*v);
        }
    }

    /// 각 시점의 분위수 채널을 오름차순으로 정렬합니다.
    pub fn fix_crossing(&mut self) {
        let start = self.first_quantile_channel();
        let channels = self.channels();
        let mut buf = Vec::with_capacity(channels - start);

        for step in 0..self.horizon() {
            buf.clear();
            buf.extend((start..channels).map(|c| self.value(step, c)));
            buf.sort_by(f64::total_cmp);
            for (offset, v) in buf.iter().enumerate() {
                *self.value_mut(step, start + offset) = *v;
            }
        }
    }

    /// 앞쪽 `horizon` 시점만 남깁니다.
    pub fn truncate_horizon(&self, horizon: usize) -> ForecastResult<Self> {
        if horizon > self.horizon() {
            return Err(ForecastError::Inference(format!(
                "model returned {} quantile steps, requested {}",
                self.horizon(),
                horizon
            )));
        }
        let channels: Vec<Vec<f64>> = (0..self.channels())
            .map(|c| self.channel(c)[..horizon].to_vec())
            .collect();
        Self::from_channels(&channels, self.has_mean_channel)
    }
}

/// 모델 원시 출력.
#[derive(Debug, Clone, PartialEq)]
pub struct RawForecast {
    /// 점 예측 (길이 = horizon)
    pub point: Vec<f64>,
    /// 분위수 예측
    pub quantiles: QuantileMatrix,
}

impl RawForecast {
    /// 요청한 길이와 일치하는지 확인합니다.
    pub fn validate(&self, horizon: usize) -> ForecastResult<()> {
        if self.point.len() != horizon {
            return Err(ForecastError::Inference(format!(
                "point forecast has {} steps, requested {}",
                self.point.len(),
                horizon
            )));
        }
        if self.quantiles.horizon() != horizon {
            return Err(ForecastError::Inference(format!(
                "quantile forecast has {} steps, requested {}",
                self.quantiles.horizon(),
                horizon
            )));
        }
        Ok(())
    }
}

/// 예측 구간.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastBand {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 평균 + 분위수 3개, horizon 2
    fn channels() -> Vec<Vec<f64>> {
        vec![
            vec![10.0, 11.0], // mean
            vec![9.0, 9.5],   // low
            vec![10.0, 11.0], // mid
            vec![11.0, 12.5], // high
        ]
    }

    #[test]
    fn test_band_identical_for_both_orientations() {
        let ch = channels();

        // (horizon, quantiles)
        let mut hm = Vec::new();
        for step in 0..2 {
            for c in &ch {
                hm.push(c[step]);
            }
        }
        // (quantiles, horizon)
        let qm: Vec<f64> = ch.iter().flatten().copied().collect();

        let a = QuantileMatrix::from_shape(hm, 2, 4, 2, true).unwrap();
        let b = QuantileMatrix::from_shape(qm, 4, 2, 2, true).unwrap();

        assert_eq!(a.layout(), QuantileLayout::HorizonMajor);
        assert_eq!(b.layout(), QuantileLayout::QuantileMajor);
        assert_eq!(a.band(), b.band());
        assert_eq!(a.band().lower, vec![9.0, 9.5]);
        assert_eq!(a.band().upper, vec![11.0, 12.5]);
    }

    #[test]
    fn test_explicit_layout_when_shape_is_square() {
        // horizon == 채널 수이면 shape만으로는 방향을 알 수 없습니다.
        let qm = vec![1.0, 2.0, 3.0, 4.0];
        let m = QuantileMatrix::new(qm, 2, 2, QuantileLayout::QuantileMajor, false).unwrap();
        assert_eq!(m.band().lower, vec![1.0, 2.0]);
        assert_eq!(m.band().upper, vec![3.0, 4.0]);
    }

    #[test]
    fn test_mean_channel_excluded_from_band() {
        let m = QuantileMatrix::from_channels(&channels(), true).unwrap();
        assert_eq!(m.lower_trace(), vec![9.0, 9.5]);

        let m = QuantileMatrix::from_channels(&channels(), false).unwrap();
        assert_eq!(m.lower_trace(), vec![10.0, 11.0]);
    }

    #[test]
    fn test_fix_crossing_sorts_per_step() {
        let mut m = QuantileMatrix::from_channels(
            &[vec![5.0], vec![6.0], vec![4.0], vec![5.5]],
            true,
        )
        .unwrap();
        m.fix_crossing();
        assert_eq!(m.channel(0), vec![5.0]);
        assert_eq!(m.channel(1), vec![4.0]);
        assert_eq!(m.channel(2), vec![5.5]);
        assert_eq!(m.channel(3), vec![6.0]);
    }

    #[test]
    fn test_truncate_horizon() {
        let m = QuantileMatrix::from_channels(&channels(), true).unwrap();
        let t = m.truncate_horizon(1).unwrap();
        assert_eq!(t.horizon(), 1);
        assert_eq!(t.upper_trace(), vec![11.0]);
        assert!(m.truncate_horizon(3).is_err());
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        assert!(QuantileMatrix::new(vec![1.0; 5], 2, 3, QuantileLayout::HorizonMajor, false).is_err());
        assert!(QuantileMatrix::new(vec![1.0; 2], 2, 1, QuantileLayout::HorizonMajor, true).is_err());
    }

    #[test]
    fn test_layout_from_str() {
        assert_eq!(
            "horizon_major".parse::<QuantileLayout>().unwrap(),
            QuantileLayout::HorizonMajor
        );
        assert!("diagonal".parse::<QuantileLayout>().is_err());
    }
}
