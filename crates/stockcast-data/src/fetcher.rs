//! 재시도 분봉 수집기.
//!
//! 소스 호출, 재시도/백오프, 수정주가 없는 폴백, 정제, 당일 필터를
//! 하나의 흐름으로 묶습니다.
//!
//! # 재시도 규칙
//!
//! - 일시적 오류(타임아웃, 연결 실패)만 재시도합니다.
//! - k번째 시도가 실패하면 `k × backoff_step` 만큼 비동기로 대기합니다.
//! - 마지막 시도까지 실패하면 수정주가를 요청한 경우에만 수정 없이 한 번 더
//!   시도하고, 그래도 실패하면 [`DataError::DataUnavailable`]을 반환합니다.
//! - 그 외 오류는 즉시 반환합니다.

use chrono::NaiveDateTime;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use stockcast_core::{Adjust, BarPeriod, DataConfig, StockSeries};

use crate::clean::clean_bars;
use crate::error::{DataError, Result};
use crate::fetch_log::{FetchLog, FetchStep};
use crate::source::{MarketDataSource, RawBar};
use crate::today::filter_today;

/// 재시도 정책.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 최대 시도 횟수
    pub max_attempts: u32,
    /// 대기 증가 단위
    pub backoff_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_step: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// `[data]` 설정에서 생성합니다.
    pub fn from_config(config: &DataConfig) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            backoff_step: Duration::from_secs(config.backoff_step_secs),
        }
    }

    /// `attempt`번째 시도 실패 후 대기 시간.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff_step * attempt
    }
}

/// 수집 요청.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// 정규화된 종목 코드
    pub symbol: String,
    pub period: BarPeriod,
    pub adjust: Adjust,
    /// 당일 봉만 남길지 여부
    pub today_only: bool,
}

/// 수집 결과.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub symbol: String,
    pub series: StockSeries,
    pub log: FetchLog,
}

/// 분봉 수집기.
#[derive(Clone)]
pub struct DataFetcher {
    source: Arc<dyn MarketDataSource>,
    policy: RetryPolicy,
}

impl DataFetcher {
    /// 새 수집기를 생성합니다.
    pub fn new(source: Arc<dyn MarketDataSource>, policy: RetryPolicy) -> Self {
        Self { source, policy }
    }

    /// 데이터 소스 이름.
    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// 재시도 정책.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// 분봉을 수집하고 정제합니다.
    pub async fn fetch(&self, request: &FetchRequest, now: NaiveDateTime) -> Result<FetchOutcome> {
        let mut log = FetchLog::new();
        let series = self.fetch_with_log(request, now, &mut log).await?;
        Ok(FetchOutcome {
            symbol: request.symbol.clone(),
            series,
            log,
        })
    }

    /// 실패해도 호출자가 단계 기록을 볼 수 있도록 `log`에 기록하며 수집합니다.
    pub async fn fetch_with_log(
        &self,
        request: &FetchRequest,
        now: NaiveDateTime,
        log: &mut FetchLog,
    ) -> Result<StockSeries> {
        log.push(FetchStep::Request {
            symbol: request.symbol.clone(),
            period: request.period,
            adjust: request.adjust,
            today_only: request.today_only,
        });

        let raw = self.fetch_raw_with_retry(request, log).await?;
        if raw.is_empty() {
            log.push(FetchStep::EmptyResult);
            return Err(DataError::EmptyResult {
                symbol: request.symbol.clone(),
                period: request.period,
                adjust: request.adjust,
            });
        }

        let mut series = clean_bars(raw, log);

        if request.today_only {
            series = filter_today(&series, now);
            log.push(FetchStep::TodayFilter {
                rows: series.len(),
                first: series.first_timestamp(),
                last: series.last_timestamp(),
            });
        }

        info!(
            symbol = %request.symbol,
            period = %request.period,
            adjust = %request.adjust,
            rows = series.len(),
            retries = log.retry_count(),
            "분봉 수집 완료"
        );

        Ok(series)
    }

    async fn fetch_raw_with_retry(
        &self,
        request: &FetchRequest,
        log: &mut FetchLog,
    ) -> Result<Vec<RawBar>> {
        let max_attempts = self.policy.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            let result = self
                .source
                .fetch_minute_bars(&request.symbol, request.period, request.adjust)
                .await;

            let err = match result {
                Ok(rows) => return Ok(rows),
                Err(e) => e,
            };

            if !err.is_transient() {
                warn!(symbol = %request.symbol, error = %err, "재시도하지 않는 수집 오류");
                log.push(FetchStep::NonTransientError {
                    error: err.to_string(),
                });
                return Err(err);
            }

            log.push(FetchStep::AttemptFailed {
                attempt,
                error: err.to_string(),
            });

            if attempt < max_attempts {
                let wait = self.policy.delay_for(attempt);
                debug!(
                    symbol = %request.symbol,
                    attempt,
                    wait_secs = wait.as_secs_f64(),
                    error = %err,
                    "수집 재시도 예정"
                );
                log.push(FetchStep::RetryScheduled { attempt, wait });
                tokio::time::sleep(wait).await;
            }
        }

        warn!(
            symbol = %request.symbol,
            attempts = max_attempts,
            "모든 재시도 실패"
        );
        log.push(FetchStep::RetriesExhausted);

        if !request.adjust.is_adjusted() {
            log.push(FetchStep::FinalFailure {
                error: "no fallback without adjustment".to_string(),
            });
            return Err(DataError::DataUnavailable {
                symbol: request.symbol.clone(),
            });
        }

        log.push(FetchStep::FallbackWithoutAdjust);
        match self
            .source
            .fetch_minute_bars(&request.symbol, request.period, Adjust::None)
            .await
        {
            Ok(rows) => {
                info!(symbol = %request.symbol, "수정주가 없이 수집 성공");
                Ok(rows)
            }
            Err(e) => {
                warn!(symbol = %request.symbol, error = %e, "폴백 수집 실패");
                log.push(FetchStep::FinalFailure {
                    error: e.to_string(),
                });
                Err(DataError::DataUnavailable {
                    symbol: request.symbol.clone(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::fixture::StaticMarketSource;
    use chrono::NaiveDate;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap()
    }

    fn request(adjust: Adjust) -> FetchRequest {
        FetchRequest {
            symbol: "sh603688".to_string(),
            period: BarPeriod::M60,
            adjust,
            today_only: false,
        }
    }

    fn timeout() -> DataError {
        DataError::Timeout("operation timed out".to_string())
    }

    fn fetcher(source: Arc<StaticMarketSource>) -> DataFetcher {
        DataFetcher::new(source, RetryPolicy::default())
    }

    #[test]
    fn test_retry_policy_delays() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));

        let config = DataConfig {
            max_retries: 0,
            ..Default::default()
        };
        assert_eq!(RetryPolicy::from_config(&config).max_attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_transient_failures_then_success() {
        let source = Arc::new(
            StaticMarketSource::with_closes(start(), BarPeriod::M60, &[10.0, 10.5, 11.0])
                .with_failures(vec![timeout(), timeout()]),
        );
        let began = tokio::time::Instant::now();

        let outcome = fetcher(source.clone())
            .fetch(&request(Adjust::Qfq), start())
            .await
            .unwrap();

        assert_eq!(outcome.series.len(), 3);
        assert_eq!(outcome.log.retry_count(), 2);
        assert_eq!(
            outcome.log.retry_waits(),
            vec![Duration::from_secs(2), Duration::from_secs(4)]
        );
        assert!(!outcome.log.used_fallback());
        assert!(began.elapsed() >= Duration::from_secs(6));
        assert_eq!(source.calls().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallback_without_adjust_after_exhaustion() {
        let source = Arc::new(
            StaticMarketSource::with_closes(start(), BarPeriod::M60, &[10.0, 10.5])
                .with_failures(vec![timeout(), timeout(), timeout()]),
        );

        let outcome = fetcher(source.clone())
            .fetch(&request(Adjust::Qfq), start())
            .await
            .unwrap();

        assert!(outcome.log.used_fallback());
        assert_eq!(outcome.series.len(), 2);

        let calls = source.calls();
        assert_eq!(calls.len(), 4);
        assert!(calls[..3].iter().all(|c| c.adjust == Adjust::Qfq));
        assert_eq!(calls[3].adjust, Adjust::None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallback_failure_is_data_unavailable() {
        let source = Arc::new(
            StaticMarketSource::new(Vec::new())
                .with_failures(vec![timeout(), timeout(), timeout(), timeout()]),
        );

        let err = fetcher(source.clone())
            .fetch(&request(Adjust::Hfq), start())
            .await
            .unwrap_err();

        assert!(matches!(err, DataError::DataUnavailable { ref symbol } if symbol == "sh603688"));
        assert_eq!(source.calls().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unadjusted_exhaustion_has_no_fallback() {
        let source = Arc::new(
            StaticMarketSource::new(Vec::new())
                .with_failures(vec![timeout(), timeout(), timeout()]),
        );

        let mut log = FetchLog::new();
        let err = fetcher(source.clone())
            .fetch_with_log(&request(Adjust::None), start(), &mut log)
            .await
            .unwrap_err();

        assert!(matches!(err, DataError::DataUnavailable { .. }));
        assert_eq!(source.calls().len(), 3);
        assert!(!log.used_fallback());
        assert_eq!(log.retry_count(), 2);
    }

    #[tokio::test]
    async fn test_non_transient_error_fails_immediately() {
        let source = Arc::new(StaticMarketSource::new(Vec::new()).with_failures(vec![
            DataError::Http {
                status: 404,
                message: "not found".to_string(),
            },
        ]));

        let err = fetcher(source.clone())
            .fetch(&request(Adjust::Qfq), start())
            .await
            .unwrap_err();

        assert!(matches!(err, DataError::Http { status: 404, .. }));
        assert_eq!(source.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_result() {
        let source = Arc::new(StaticMarketSource::new(Vec::new()));

        let err = fetcher(source)
            .fetch(&request(Adjust::None), start())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DataError::EmptyResult {
                period: BarPeriod::M60,
                adjust: Adjust::None,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_today_only_filters_by_now() {
        let source = Arc::new(StaticMarketSource::with_closes(
            start(),
            BarPeriod::M60,
            &[1.0, 2.0, 3.0, 4.0],
        ));
        let mut req = request(Adjust::None);
        req.today_only = true;

        // 10:30, 11:30, 12:30, 13:30 중 12:00 이전만 남음
        let now = start() + chrono::Duration::minutes(90);
        let outcome = fetcher(source).fetch(&req, now).await.unwrap();

        assert_eq!(outcome.series.closes(), vec![1.0, 2.0]);
        assert!(outcome
            .log
            .steps()
            .iter()
            .any(|s| matches!(s, FetchStep::TodayFilter { rows: 2, .. })));
    }
}
