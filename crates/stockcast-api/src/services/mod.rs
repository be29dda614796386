//! 핸들러가 공유하는 요청 처리 서비스.
//!
//! 시세 수집과 예측 실행을 메트릭/로그 기록과 함께 제공합니다.

pub mod forecast;
pub mod market;

pub use forecast::{plan_horizon, run_forecast};
pub use market::{build_fetch_request, company_name, fetch_series};
