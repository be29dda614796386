//! 예측 길이 결정.

use serde::Serialize;
use tracing::warn;

use stockcast_core::BarPeriod;

use super::error::{ForecastError, ForecastResult};

/// 향후 거래일 수 (`next3` 옵션).
pub const NEXT_TRADING_DAYS: usize = 3;

/// 결정된 예측 길이.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HorizonPlan {
    /// 실제 예측할 시점 수
    pub steps: usize,
    /// 제한 전 요청 값
    pub requested: usize,
    /// 최대 예측 길이로 잘렸는지 여부
    pub clamped: bool,
    /// 향후 3거래일 모드 여부
    pub next3: bool,
}

/// 예측 길이를 결정합니다.
///
/// `next3`이면 주기의 하루 봉 수 × 3을 쓰며 `explicit`은 무시됩니다.
/// `max_horizon`을 넘으면 잘라내고 경고를 남깁니다.
pub fn resolve_horizon(
    next3: bool,
    period: BarPeriod,
    explicit: usize,
    max_horizon: usize,
) -> ForecastResult<HorizonPlan> {
    let requested = if next3 {
        period.steps_per_day() * NEXT_TRADING_DAYS
    } else {
        explicit
    };

    if requested == 0 {
        return Err(ForecastError::InvalidInput(
            "horizon must be >= 1".to_string(),
        ));
    }

    let clamped = requested > max_horizon;
    let steps = requested.min(max_horizon);
    if clamped {
        warn!(
            requested,
            max_horizon,
            period = %period,
            "예측 길이가 최대값을 넘어 잘림"
        );
    }

    Ok(HorizonPlan {
        steps,
        requested,
        clamped,
        next3,
    })
}
