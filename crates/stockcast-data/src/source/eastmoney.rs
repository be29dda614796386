//! EastMoney 종목명 조회.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use stockcast_core::{DataConfig, Symbol};

use super::CompanyInfoSource;
use crate::error::{DataError, Result};

/// EastMoney 종목 정보 소스.
#[derive(Clone)]
pub struct EastMoneyCompanySource {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    data: Option<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    f58: Option<String>,
}

impl EastMoneyCompanySource {
    /// 새 소스를 생성합니다.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0")
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// `[data]` 설정에서 생성합니다.
    pub fn from_config(config: &DataConfig) -> Result<Self> {
        Self::new(
            &config.eastmoney_base_url,
            Duration::from_secs(config.request_timeout_secs),
        )
    }
}

#[async_trait]
impl CompanyInfoSource for EastMoneyCompanySource {
    async fn company_name(&self, symbol: &Symbol) -> Result<Option<String>> {
        let url = format!("{}/api/qt/stock/get", self.base_url);
        let secid = format!(
            "{}.{}",
            symbol.exchange().eastmoney_market_id(),
            symbol.code()
        );

        let response = self
            .client
            .get(&url)
            .query(&[("secid", secid.as_str()), ("fields", "f57,f58")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DataError::Http {
                status: status.as_u16(),
                message: format!("company lookup for {}", symbol),
            });
        }

        let quote: QuoteResponse = response.json().await?;
        Ok(quote
            .data
            .and_then(|d| d.f58)
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty()))
    }
}

/// 종목명을 조회합니다. 실패해도 요청을 중단하지 않습니다.
///
/// 일시적 오류는 `delay` 간격으로 최대 `attempts`회 시도합니다.
/// 그 외 오류나 파싱할 수 없는 종목 코드는 `None`을 반환합니다.
pub async fn lookup_company_name(
    source: &dyn CompanyInfoSource,
    symbol: &str,
    attempts: u32,
    delay: Duration,
) -> Option<String> {
    let symbol = Symbol::parse(symbol)?;
    let attempts = attempts.max(1);

    for attempt in 1..=attempts {
        match source.company_name(&symbol).await {
            Ok(name) => return name,
            Err(e) if e.is_transient() && attempt < attempts => {
                debug!(symbol = %symbol, attempt, error = %e, "종목명 조회 재시도");
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "종목명 조회 실패");
                return None;
            }
        }
    }

    None
}
