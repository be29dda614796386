//! 예측 차트 렌더링.
//!
//! 과거 종가, 점 예측, 예측 구간을 하나의 PNG로 그립니다.
//! 글꼴 없이 렌더링되도록 텍스트는 그리지 않습니다.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use plotters::prelude::*;
use serde::{Deserialize, Serialize};
use stockcast_core::ChartConfig;

use crate::forecast::{ForecastBand, ForecastError, ForecastResult};

const HISTORY_COLOR: RGBColor = RGBColor(0x25, 0x63, 0xeb);
const FORECAST_COLOR: RGBColor = RGBColor(0xdc, 0x26, 0x26);
const BAND_COLOR: RGBColor = RGBColor(0xfe, 0xca, 0xca);
const DIVIDER_COLOR: RGBColor = RGBColor(0x64, 0x74, 0x8b);
const GRID_COLOR: RGBColor = RGBColor(0xe5, 0xe7, 0xeb);

/// 차트 크기 설정.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartOptions {
    pub width: u32,
    pub height: u32,
}

impl ChartOptions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self::new(1600, 800)
    }
}

impl From<&ChartConfig> for ChartOptions {
    fn from(config: &ChartConfig) -> Self {
        Self::new(config.width, config.height)
    }
}

fn render_err<E: std::fmt::Display>(err: E) -> ForecastError {
    ForecastError::Render(err.to_string())
}

/// y축 범위 (위아래 5% 여백).
fn value_range(series: &[&[f64]]) -> (f64, f64) {
    let (lo, hi) = series
        .iter()
        .flat_map(|s| s.iter().copied())
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });

    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    let pad = if hi > lo { (hi - lo) * 0.05 } else { 1.0 };
    (lo - pad, hi + pad)
}

/// 과거/예측/구간을 그린 PNG 바이트를 반환합니다.
///
/// x축은 시점 인덱스입니다. 예측선은 마지막 과거 값에서 이어지고,
/// 과거와 예측의 경계에 점선을 긋습니다.
pub fn render_forecast_png(
    history: &[f64],
    point: &[f64],
    band: &ForecastBand,
    options: &ChartOptions,
) -> ForecastResult<Vec<u8>> {
    if history.is_empty() {
        return Err(ForecastError::Render("empty history".to_string()));
    }
    if options.width == 0 || options.height == 0 {
        return Err(ForecastError::Render(format!(
            "invalid chart size {}x{}",
            options.width, options.height
        )));
    }

    let (width, height) = (options.width, options.height);
    let mut buffer = vec![0u8; width as usize * height as usize * 3];

    let last_index = (history.len() - 1) as f64;
    let last_value = history[history.len() - 1];
    let x_max = (last_index + point.len() as f64).max(1.0);
    let (y_min, y_max) = value_range(&[history, point, &band.lower, &band.upper]);

    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;

        let mut chart = ChartBuilder::on(&root)
            .margin(24)
            .build_cartesian_2d(0f64..x_max, y_min..y_max)
            .map_err(render_err)?;

        for i in 0..=4 {
            let y = y_min + (y_max - y_min) * f64::from(i) / 4.0;
            chart
                .draw_series(std::iter::once(PathElement::new(
                    vec![(0.0, y), (x_max, y)],
                    GRID_COLOR.stroke_width(1),
                )))
                .map_err(render_err)?;
        }

        let steps = band.lower.len().min(band.upper.len());
        if steps > 0 {
            let upper = (0..steps).map(|i| (last_index + (i + 1) as f64, band.upper[i]));
            let lower = (0..steps)
                .rev()
                .map(|i| (last_index + (i + 1) as f64, band.lower[i]));
            let outline: Vec<(f64, f64)> = upper.chain(lower).collect();
            chart
                .draw_series(std::iter::once(Polygon::new(
                    outline,
                    BAND_COLOR.mix(0.6).filled(),
                )))
                .map_err(render_err)?;
        }

        chart
            .draw_series(LineSeries::new(
                history.iter().enumerate().map(|(i, v)| (i as f64, *v)),
                HISTORY_COLOR.stroke_width(2),
            ))
            .map_err(render_err)?;

        if !point.is_empty() {
            let forecast = std::iter::once((last_index, last_value)).chain(
                point
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (last_index + (i + 1) as f64, *v)),
            );
            chart
                .draw_series(LineSeries::new(forecast, FORECAST_COLOR.stroke_width(2)))
                .map_err(render_err)?;
        }

        // 경계 점선
        let dash = (y_max - y_min) / 40.0;
        let dashes = (0..20).map(|k| {
            let start = y_min + dash * (2 * k) as f64;
            PathElement::new(
                vec![(last_index, start), (last_index, start + dash)],
                DIVIDER_COLOR.stroke_width(1),
            )
        });
        chart.draw_series(dashes).map_err(render_err)?;

        root.present().map_err(render_err)?;
    }

    let image = image::RgbImage::from_raw(width, height, buffer)
        .ok_or_else(|| ForecastError::Render("pixel buffer size mismatch".to_string()))?;
    let mut png = Cursor::new(Vec::new());
    image
        .write_to(&mut png, image::ImageFormat::Png)
        .map_err(render_err)?;

    Ok(png.into_inner())
}

/// PNG 바이트를 base64 문자열로 인코딩합니다.
pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

    fn band() -> ForecastBand {
        ForecastBand {
            lower: vec![9.5, 9.4, 9.2],
            upper: vec![10.5, 10.8, 11.0],
        }
    }

    #[test]
    fn test_render_png_signature() {
        let history: Vec<f64> = (0..30).map(|i| 10.0 + (i as f64 * 0.3).sin()).collect();
        let png = render_forecast_png(
            &history,
            &[10.1, 10.2, 10.15],
            &band(),
            &ChartOptions::new(400, 200),
        )
        .unwrap();
        assert_eq!(&png[..8], PNG_SIGNATURE);
    }

    #[test]
    fn test_render_flat_series() {
        let png = render_forecast_png(
            &[5.0; 12],
            &[5.0; 3],
            &ForecastBand {
                lower: vec![5.0; 3],
                upper: vec![5.0; 3],
            },
            &ChartOptions::new(200, 100),
        )
        .unwrap();
        assert_eq!(&png[..8], PNG_SIGNATURE);
    }

    #[test]
    fn test_render_rejects_empty_history() {
        let err = render_forecast_png(&[], &[1.0], &band(), &ChartOptions::default()).unwrap_err();
        assert!(matches!(err, ForecastError::Render(_)));
    }

    #[test]
    fn test_encode_base64() {
        assert_eq!(encode_base64(b"png"), "cG5n");
        assert_eq!(ChartOptions::default(), ChartOptions::new(1600, 800));
    }
}
