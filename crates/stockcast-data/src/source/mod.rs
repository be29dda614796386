//! 업스트림 데이터 소스.
//!
//! - [`MarketDataSource`]: 분봉 시세 (Sina K-line)
//! - [`CompanyInfoSource`]: 종목명 (EastMoney)

pub mod eastmoney;
#[cfg(any(test, feature = "test-utils"))]
pub mod fixture;
pub mod sina;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use stockcast_core::{Adjust, BarPeriod, Symbol};

use crate::error::Result;

pub use eastmoney::{lookup_company_name, EastMoneyCompanySource};
pub use sina::SinaMinuteSource;

/// 업스트림이 반환한 그대로의 분봉 행.
///
/// 모든 값은 문자열입니다. 숫자 변환과 검증은 정제 단계에서 합니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    #[serde(default, deserialize_with = "lenient_string")]
    pub day: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub open: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub high: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub low: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub close: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub volume: Option<String>,
}

impl RawBar {
    /// 시각과 종가만 있는 행을 생성합니다.
    pub fn new(day: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            day: Some(day.into()),
            close: Some(close.into()),
            ..Default::default()
        }
    }

    /// OHLCV 전체 값을 가진 행을 생성합니다.
    pub fn ohlcv(day: impl Into<String>, values: [f64; 5]) -> Self {
        let [open, high, low, close, volume] = values;
        Self {
            day: Some(day.into()),
            open: Some(open.to_string()),
            high: Some(high.to_string()),
            low: Some(low.to_string()),
            close: Some(close.to_string()),
            volume: Some(volume.to_string()),
        }
    }
}

/// 문자열/숫자/null 어느 쪽이든 `Option<String>`으로 받습니다.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// 분봉 시세 소스.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// 소스 이름 (로그/헬스체크용).
    fn name(&self) -> &str;

    /// 정규화된 종목 코드의 분봉을 조회합니다.
    ///
    /// 결과는 업스트림 순서 그대로이며 비어 있을 수 있습니다.
    async fn fetch_minute_bars(
        &self,
        symbol: &str,
        period: BarPeriod,
        adjust: Adjust,
    ) -> Result<Vec<RawBar>>;
}

/// 종목명 조회 소스.
#[async_trait]
pub trait CompanyInfoSource: Send + Sync {
    /// 종목명을 조회합니다. 업스트림에 정보가 없으면 `None`.
    async fn company_name(&self, symbol: &Symbol) -> Result<Option<String>>;
}
