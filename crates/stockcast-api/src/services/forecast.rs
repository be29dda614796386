//! 예측 실행 서비스.

use std::time::Instant;

use tracing::info;

use stockcast_analytics::{resolve_horizon, ForecastError, ForecastOutcome, HorizonPlan};
use stockcast_core::BarPeriod;

use crate::metrics::record_forecast;
use crate::state::AppState;

/// 서비스의 최대 예측 길이로 예측 길이를 결정합니다.
pub fn plan_horizon(
    state: &AppState,
    next3: bool,
    period: BarPeriod,
    horizon: usize,
) -> Result<HorizonPlan, ForecastError> {
    resolve_horizon(next3, period, horizon, state.forecast.config().max_horizon)
}

/// 예측과 차트 렌더링을 실행하고 메트릭을 기록합니다.
pub async fn run_forecast(
    state: &AppState,
    closes: &[f64],
    lookback: usize,
    plan: &HorizonPlan,
) -> Result<ForecastOutcome, ForecastError> {
    let started = Instant::now();
    let result = state
        .forecast
        .forecast_with_chart(closes, lookback, plan, state.chart_options())
        .await;
    let elapsed = started.elapsed().as_secs_f64();

    let model = state.forecast.config().model_name.as_str();
    match &result {
        Ok(outcome) => {
            record_forecast(model, "ok", elapsed);
            info!(
                model,
                lookback,
                horizon = plan.steps,
                trend = %outcome.summary.trend,
                elapsed_ms = (elapsed * 1000.0) as u64,
                "예측 완료"
            );
        }
        Err(e) => {
            let outcome = if e.is_recoverable() { "rejected" } else { "error" };
            record_forecast(model, outcome, elapsed);
        }
    }

    result
}
