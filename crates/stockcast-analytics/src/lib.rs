//! # Stockcast Analytics
//!
//! 분봉 종가 시계열 예측을 담당합니다.
//!
//! - `forecast`: 예측 모델 백엔드, 분위수 밴드, 요약 통계, 예측 서비스
//! - `chart`: 과거/예측/밴드를 그린 PNG 차트

pub mod chart;
pub mod forecast;

pub use chart::{encode_base64, render_forecast_png, ChartOptions};
pub use forecast::*;
