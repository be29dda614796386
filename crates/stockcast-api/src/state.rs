//! 모든 핸들러에서 공유되는 애플리케이션 상태.
//!
//! AppState는 Arc로 래핑되어 여러 요청 간에 공유됩니다. 요청별 데이터는
//! 핸들러 안에만 존재하며, 공유되는 가변 자원은 예측 서비스 내부의 모델
//! 하나뿐입니다.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use stockcast_analytics::{ChartOptions, ForecastService, ForecasterConfig};
use stockcast_core::AppConfig;
use stockcast_data::{
    CompanyInfoSource, DataFetcher, EastMoneyCompanySource, RetryPolicy, SinaMinuteSource,
};

use crate::error::AppError;

/// 애플리케이션 공유 상태.
#[derive(Clone)]
pub struct AppState {
    /// 로드된 설정
    pub config: Arc<AppConfig>,

    /// 재시도/폴백을 포함한 분봉 수집기
    pub fetcher: DataFetcher,

    /// 회사명 조회 소스
    pub company_source: Arc<dyn CompanyInfoSource>,

    /// 예측 서비스 (모델은 첫 예측 때 로드)
    pub forecast: Arc<ForecastService>,

    /// 서버 시작 시각
    pub started_at: DateTime<Utc>,

    /// 버전
    pub version: String,
}

impl AppState {
    /// 구성 요소로 상태를 생성합니다.
    pub fn new(
        config: AppConfig,
        fetcher: DataFetcher,
        company_source: Arc<dyn CompanyInfoSource>,
        forecast: ForecastService,
    ) -> Self {
        Self {
            config: Arc::new(config),
            fetcher,
            company_source,
            forecast: Arc::new(forecast),
            started_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// 설정으로 실제 데이터 소스와 예측 서비스를 구성합니다.
    pub fn from_config(config: AppConfig) -> Result<Self, AppError> {
        let source = SinaMinuteSource::from_config(&config.data)?;
        let fetcher = DataFetcher::new(Arc::new(source), RetryPolicy::from_config(&config.data));
        let company = EastMoneyCompanySource::from_config(&config.data)?;
        let forecast = ForecastService::new(ForecasterConfig::from_model_config(&config.model)?);

        Ok(Self::new(config, fetcher, Arc::new(company), forecast))
    }

    /// 서버 업타임(초).
    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }

    /// 차트 크기.
    pub fn chart_options(&self) -> ChartOptions {
        ChartOptions::from(&self.config.chart)
    }

    /// 회사명 조회 재시도 설정 (횟수, 간격).
    pub fn company_lookup_policy(&self) -> (u32, Duration) {
        (
            self.config.data.company_lookup_retries,
            Duration::from_millis(self.config.data.company_lookup_delay_ms),
        )
    }
}

/// 테스트용 AppState 생성.
///
/// 고정 분봉 120개(60분봉, 10.00부터 0.05씩 상승), 고정 회사명,
/// 선형 추세 예측기, 대기 없는 재시도 정책을 사용합니다.
#[cfg(any(test, feature = "test-utils"))]
pub fn create_test_state() -> AppState {
    use chrono::NaiveDate;
    use stockcast_core::BarPeriod;
    use stockcast_data::StaticMarketSource;

    let closes: Vec<f64> = (0..120).map(|i| 10.0 + 0.05 * f64::from(i)).collect();
    let start = NaiveDate::from_ymd_opt(2024, 3, 1)
        .and_then(|d| d.and_hms_opt(10, 30, 0))
        .unwrap_or_default();
    let source = StaticMarketSource::with_closes(start, BarPeriod::M60, &closes);

    create_test_state_with_source(Arc::new(source))
}

/// 지정한 분봉 소스로 테스트용 AppState 생성.
#[cfg(any(test, feature = "test-utils"))]
pub fn create_test_state_with_source(
    source: Arc<dyn stockcast_data::MarketDataSource>,
) -> AppState {
    use stockcast_data::StaticCompanySource;

    let mut config = AppConfig::default();
    config.chart.width = 320;
    config.chart.height = 160;
    config.data.company_lookup_delay_ms = 0;

    let policy = RetryPolicy {
        max_attempts: 3,
        backoff_step: Duration::ZERO,
    };

    AppState::new(
        config,
        DataFetcher::new(source, policy),
        Arc::new(StaticCompanySource::new(Some("测试公司"))),
        ForecastService::new(ForecasterConfig::drift()),
    )
}
