//! 시세 조회 서비스.
//!
//! 요청 파라미터 해석, 분봉 수집, 회사명 조회를 핸들러들이 같은 방식으로
//! 쓰도록 묶습니다.

use tracing::{info, warn};

use stockcast_core::{normalize_symbol, Adjust, BarPeriod, MarketHint, StockSeries};
use stockcast_data::{lookup_company_name, market_now, DataError, FetchLog, FetchRequest};

use crate::error::AppError;
use crate::metrics::{record_fetch, record_fetch_retries};
use crate::state::AppState;

/// 원시 요청 값으로 수집 요청을 만듭니다.
///
/// 종목 코드는 시장 힌트에 따라 정규화됩니다.
pub fn build_fetch_request(
    raw_symbol: &str,
    market: &str,
    period: &str,
    adjust: &str,
    today_only: bool,
) -> Result<FetchRequest, AppError> {
    let symbol = normalize_symbol(raw_symbol, MarketHint::parse_lenient(market));
    if symbol.is_empty() {
        return Err(AppError::BadRequest("股票代码不能为空".to_string()));
    }

    Ok(FetchRequest {
        symbol,
        period: period.parse::<BarPeriod>()?,
        adjust: adjust.parse::<Adjust>()?,
        today_only,
    })
}

/// 분봉을 수집하고 메트릭을 기록합니다.
///
/// 실패해도 `log`에는 그때까지의 단계가 남습니다.
pub async fn fetch_series(
    state: &AppState,
    request: &FetchRequest,
    log: &mut FetchLog,
) -> Result<StockSeries, DataError> {
    let result = state
        .fetcher
        .fetch_with_log(request, market_now(), log)
        .await;

    record_fetch_retries(log.retry_count());
    let outcome = match &result {
        Ok(_) if log.used_fallback() => "fallback",
        Ok(_) => "ok",
        Err(DataError::EmptyResult { .. }) => "empty",
        Err(DataError::DataUnavailable { .. }) => "unavailable",
        Err(_) => "error",
    };
    record_fetch(outcome);

    match &result {
        Ok(series) => info!(
            symbol = %request.symbol,
            period = %request.period,
            rows = series.len(),
            retries = log.retry_count(),
            outcome,
            "분봉 수집 완료"
        ),
        Err(e) => warn!(symbol = %request.symbol, error = %e, outcome, "분봉 수집 실패"),
    }

    result
}

/// 회사명을 조회합니다. 실패하면 `None`입니다.
pub async fn company_name(state: &AppState, symbol: &str) -> Option<String> {
    let (attempts, delay) = state.company_lookup_policy();
    lookup_company_name(state.company_source.as_ref(), symbol, attempts, delay).await
}
