//! # Stockcast Data
//!
//! 분봉 시세 수집과 정제를 담당합니다.
//!
//! - `source`: 업스트림 데이터 소스 (Sina 분봉, 수정주가 계수, EastMoney 종목명)
//! - `fetcher`: 재시도/백오프/수정주가 없는 폴백을 포함한 수집기
//! - `clean`: 타임스탬프 파싱, 정렬, 숫자 변환, 결측 제거
//! - `today`: 당일 필터와 시장 현지 시각
//! - `fetch_log`: 각 단계의 구조화된 기록

pub mod clean;
pub mod error;
pub mod fetch_log;
pub mod fetcher;
pub mod source;
pub mod today;

pub use clean::{clean_bars, parse_timestamp};
pub use error::{DataError, Result};
pub use fetch_log::{FetchLog, FetchStep};
pub use fetcher::{DataFetcher, FetchOutcome, FetchRequest, RetryPolicy};
pub use source::{
    lookup_company_name, CompanyInfoSource, EastMoneyCompanySource, MarketDataSource, RawBar,
    SinaMinuteSource,
};
pub use today::{filter_today, market_now};

#[cfg(any(test, feature = "test-utils"))]
pub use source::fixture::{StaticCompanySource, StaticMarketSource};
