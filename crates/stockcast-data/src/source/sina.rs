//! Sina K-line 분봉 소스.
//!
//! `CN_MarketDataService.getKLineData` JSONP 응답에서 분봉을 읽습니다.
//! 수정주가(qfq/hfq)는 업스트림이 직접 제공하지 않으므로 별도의 계수 파일을
//! 받아 가격 열에 적용합니다.
//!
//! # 사용 예제
//!
//! ```rust,ignore
//! use stockcast_data::{MarketDataSource, SinaMinuteSource};
//! use stockcast_core::{Adjust, BarPeriod, DataConfig};
//!
//! let source = SinaMinuteSource::from_config(&DataConfig::default())?;
//! let rows = source.fetch_minute_bars("sh603688", BarPeriod::M60, Adjust::Qfq).await?;
//! ```

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

use stockcast_core::{Adjust, BarPeriod, DataConfig};

use super::{MarketDataSource, RawBar};
use crate::error::{DataError, Result};

const KLINE_PATH: &str = "/cn/api/jsonp_v2.php/=/CN_MarketDataService.getKLineData";

/// Sina 분봉 소스.
#[derive(Clone)]
pub struct SinaMinuteSource {
    client: reqwest::Client,
    base_url: String,
    finance_base_url: String,
    datalen: usize,
}

/// 수정주가 계수 하나. `date`부터 적용됩니다.
#[derive(Debug, Clone, Copy, PartialEq)]
struct AdjustFactor {
    date: NaiveDate,
    factor: f64,
}

impl SinaMinuteSource {
    /// 새 소스를 생성합니다.
    pub fn new(
        base_url: impl Into<String>,
        finance_base_url: impl Into<String>,
        datalen: usize,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0")
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            finance_base_url: finance_base_url.into().trim_end_matches('/').to_string(),
            datalen,
        })
    }

    /// `[data]` 설정에서 생성합니다.
    pub fn from_config(config: &DataConfig) -> Result<Self> {
        Self::new(
            &config.sina_base_url,
            &config.finance_base_url,
            config.datalen,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    async fn get_text(&self, url: &str, query: &[(&str, String)]) -> Result<String> {
        let response = self.client.get(url).query(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DataError::Http {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        Ok(response.text().await?)
    }

    async fn fetch_raw(&self, symbol: &str, period: BarPeriod) -> Result<Vec<RawBar>> {
        let url = format!("{}{}", self.base_url, KLINE_PATH);
        debug!(symbol = %symbol, period = %period, url = %url, "Sina K-line 요청");

        let body = self
            .get_text(
                &url,
                &[
                    ("symbol", symbol.to_string()),
                    ("scale", period.as_param()),
                    ("ma", "no".to_string()),
                    ("datalen", self.datalen.to_string()),
                ],
            )
            .await?;

        parse_kline_body(&body)
    }

    async fn fetch_factors(&self, symbol: &str, adjust: Adjust) -> Result<Vec<AdjustFactor>> {
        let url = format!(
            "{}/realstock/company/{}/{}.js",
            self.finance_base_url,
            symbol,
            adjust.as_param()
        );
        debug!(symbol = %symbol, adjust = %adjust, "수정주가 계수 요청");

        let body = self.get_text(&url, &[]).await?;
        parse_factor_body(&body)
    }
}

#[async_trait]
impl MarketDataSource for SinaMinuteSource {
    fn name(&self) -> &str {
        "sina"
    }

    async fn fetch_minute_bars(
        &self,
        symbol: &str,
        period: BarPeriod,
        adjust: Adjust,
    ) -> Result<Vec<RawBar>> {
        let mut rows = self.fetch_raw(symbol, period).await?;

        if adjust.is_adjusted() && !rows.is_empty() {
            let factors = self.fetch_factors(symbol, adjust).await?;
            apply_factors(&mut rows, &factors, adjust);
        }

        Ok(rows)
    }
}

/// JSONP 래퍼 안의 JSON 본문을 꺼냅니다.
fn strip_jsonp(body: &str) -> &str {
    let trimmed = body.trim();
    if trimmed.starts_with('[') || trimmed == "null" {
        return trimmed;
    }
    match (trimmed.find("=("), trimmed.rfind(')')) {
        (Some(start), Some(end)) if start + 2 <= end => &trimmed[start + 2..end],
        _ => match (trimmed.find('('), trimmed.rfind(')')) {
            (Some(start), Some(end)) if start < end => &trimmed[start + 1..end],
            _ => trimmed,
        },
    }
}

fn parse_kline_body(body: &str) -> Result<Vec<RawBar>> {
    let payload = strip_jsonp(body).trim();
    if payload.is_empty() || payload == "null" {
        return Ok(Vec::new());
    }

    let rows: Vec<Map<String, Value>> = serde_json::from_str(payload)?;
    rows.into_iter().map(row_to_raw_bar).collect()
}

fn row_to_raw_bar(row: Map<String, Value>) -> Result<RawBar> {
    for key in ["day", "close"] {
        if !row.contains_key(key) {
            return Err(DataError::DataFormat(format!("missing field `{}`", key)));
        }
    }
    Ok(serde_json::from_value(Value::Object(row))?)
}

fn parse_factor_body(body: &str) -> Result<Vec<AdjustFactor>> {
    let (start, end) = match (body.find('{'), body.rfind('}')) {
        (Some(start), Some(end)) if start < end => (start, end),
        _ => return Err(DataError::DataFormat("adjustment factor body".to_string())),
    };

    let doc: Value = serde_json::from_str(&body[start..=end])?;
    let entries = doc
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| DataError::DataFormat("adjustment factor `data`".to_string()))?;

    let mut factors = entries
        .iter()
        .filter_map(|entry| {
            let date = entry.get("d").and_then(Value::as_str)?;
            let date = NaiveDate::parse_from_str(date.get(..10)?, "%Y-%m-%d").ok()?;
            let factor = entry.get("f").and_then(value_as_f64)?;
            (factor.is_finite() && factor > 0.0).then_some(AdjustFactor { date, factor })
        })
        .collect::<Vec<_>>();

    factors.sort_by_key(|f| f.date);
    Ok(factors)
}

fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// 각 행의 날짜에 해당하는 계수를 가격 열에 적용합니다.
///
/// 가장 이른 계수 날짜보다 앞선 행은 계수 1.0으로 취급합니다.
fn apply_factors(rows: &mut [RawBar], factors: &[AdjustFactor], adjust: Adjust) {
    if factors.is_empty() {
        return;
    }

    for row in rows.iter_mut() {
        let Some(date) = row
            .day
            .as_deref()
            .and_then(|d| d.get(..10))
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        else {
            continue;
        };

        let idx = factors.partition_point(|f| f.date <= date);
        let factor = if idx == 0 { 1.0 } else { factors[idx - 1].factor };

        for field in [&mut row.open, &mut row.high, &mut row.low, &mut row.close] {
            if let Some(price) = field.as_deref().and_then(|v| v.trim().parse::<f64>().ok()) {
                let adjusted = match adjust {
                    Adjust::Qfq => price / factor,
                    Adjust::Hfq => price * factor,
                    Adjust::None => price,
                };
                *field = Some(adjusted.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const KLINE_BODY: &str = r#"/*<script>location.href='//sina.com';</script>*/
=([{"day":"2024-03-01 10:30:00","open":"10.000","high":"10.500","low":"9.900","close":"10.200","volume":"120000"},{"day":"2024-03-01 11:30:00","open":"10.200","high":"10.400","low":"10.100","close":"10.300","volume":"80000"}]);"#;

    fn source(server: &mockito::Server) -> SinaMinuteSource {
        SinaMinuteSource::new(server.url(), server.url(), 1970, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_strip_jsonp_variants() {
        assert_eq!(strip_jsonp("=([1,2]);"), "[1,2]");
        assert_eq!(strip_jsonp("var _x=([1]);"), "[1]");
        assert_eq!(strip_jsonp("  [1] "), "[1]");
        assert_eq!(strip_jsonp("null"), "null");
    }

    #[test]
    fn test_parse_numbers_and_nulls() {
        let rows = parse_kline_body(
            r#"=([{"day":"2024-03-01 10:30:00","open":10.1,"high":null,"low":"9.9","close":10.2,"volume":100}])"#,
        )
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].open.as_deref(), Some("10.1"));
        assert_eq!(rows[0].high, None);
        assert_eq!(rows[0].close.as_deref(), Some("10.2"));
    }

    #[test]
    fn test_missing_close_is_format_error() {
        let err = parse_kline_body(r#"=([{"day":"2024-03-01 10:30:00","open":"1"}])"#).unwrap_err();
        assert!(matches!(err, DataError::DataFormat(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_apply_factors_from_date_onward() {
        let factors = vec![
            AdjustFactor {
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                factor: 1.0,
            },
            AdjustFactor {
                date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                factor: 2.0,
            },
        ];
        let mut rows = vec![
            RawBar::new("2023-12-29 15:00:00", "8"),
            RawBar::new("2024-02-29 15:00:00", "10"),
            RawBar::new("2024-03-01 10:30:00", "10"),
        ];

        apply_factors(&mut rows, &factors, Adjust::Qfq);
        assert_eq!(rows[0].close.as_deref(), Some("8"));
        assert_eq!(rows[1].close.as_deref(), Some("10"));
        assert_eq!(rows[2].close.as_deref(), Some("5"));

        let mut rows = vec![RawBar::new("2024-03-04 10:30:00", "10")];
        apply_factors(&mut rows, &factors, Adjust::Hfq);
        assert_eq!(rows[0].close.as_deref(), Some("20"));
    }

    #[tokio::test]
    async fn test_fetch_unadjusted() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", KLINE_PATH)
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("symbol".into(), "sh603688".into()),
                Matcher::UrlEncoded("scale".into(), "60".into()),
                Matcher::UrlEncoded("ma".into(), "no".into()),
                Matcher::UrlEncoded("datalen".into(), "1970".into()),
            ]))
            .with_status(200)
            .with_body(KLINE_BODY)
            .create_async()
            .await;

        let rows = source(&server)
            .fetch_minute_bars("sh603688", BarPeriod::M60, Adjust::None)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].day.as_deref(), Some("2024-03-01 10:30:00"));
        assert_eq!(rows[1].close.as_deref(), Some("10.300"));
    }

    #[tokio::test]
    async fn test_fetch_qfq_applies_factors() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", KLINE_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(KLINE_BODY)
            .create_async()
            .await;
        let factor_mock = server
            .mock("GET", "/realstock/company/sh603688/qfq.js")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"var qfq={"total":1,"data":[{"d":"2020-01-01","f":"2.0"}]}"#)
            .create_async()
            .await;

        let rows = source(&server)
            .fetch_minute_bars("sh603688", BarPeriod::M60, Adjust::Qfq)
            .await
            .unwrap();

        factor_mock.assert_async().await;
        assert_eq!(rows[0].close.as_deref(), Some("5.1"));
        assert_eq!(rows[0].volume.as_deref(), Some("120000"));
    }

    #[tokio::test]
    async fn test_null_body_is_empty() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", KLINE_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("null")
            .create_async()
            .await;

        let rows = source(&server)
            .fetch_minute_bars("sz999999", BarPeriod::M5, Adjust::None)
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", KLINE_PATH)
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body("busy")
            .create_async()
            .await;

        let err = source(&server)
            .fetch_minute_bars("sh603688", BarPeriod::M60, Adjust::None)
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::Http { status: 503, .. }));
        assert!(!err.is_transient());
    }
}
