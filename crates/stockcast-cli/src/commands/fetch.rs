//! 분봉 조회 명령어.
//!
//! Sina 분봉을 재시도/폴백 파이프라인으로 가져와 표 또는 JSON으로 출력합니다.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::info;

use stockcast_core::{
    normalize_symbol, Adjust, AppConfig, BarPeriod, MarketHint, StockSeries,
    DISPLAY_DATETIME_FORMAT,
};
use stockcast_data::{
    market_now, DataFetcher, FetchLog, FetchRequest, RetryPolicy, SinaMinuteSource,
};

/// 조회 명령 설정.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub symbol: String,
    pub market: String,
    pub period: String,
    pub adjust: String,
    pub today: bool,
    /// 출력할 최근 행 수
    pub rows: usize,
    pub json: bool,
}

/// JSON 출력 행.
#[derive(Debug, Serialize)]
struct JsonRow {
    datetime: String,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: f64,
    volume: Option<f64>,
}

/// 원시 인자로 수집 요청을 만듭니다.
pub fn build_request(
    symbol: &str,
    market: &str,
    period: &str,
    adjust: &str,
    today: bool,
) -> Result<FetchRequest> {
    let normalized = normalize_symbol(symbol, MarketHint::parse_lenient(market));
    if normalized.is_empty() {
        bail!("symbol must not be empty");
    }

    Ok(FetchRequest {
        symbol: normalized,
        period: period
            .parse::<BarPeriod>()
            .with_context(|| format!("invalid period: {}", period))?,
        adjust: adjust
            .parse::<Adjust>()
            .with_context(|| format!("invalid adjust: {}", adjust))?,
        today_only: today,
    })
}

/// 설정으로 Sina 수집기를 생성합니다.
pub fn build_fetcher(config: &AppConfig) -> Result<DataFetcher> {
    let source =
        SinaMinuteSource::from_config(&config.data).context("failed to build HTTP client")?;
    Ok(DataFetcher::new(
        Arc::new(source),
        RetryPolicy::from_config(&config.data),
    ))
}

/// 스피너를 표시하며 분봉을 수집합니다.
pub async fn fetch_with_progress(
    fetcher: &DataFetcher,
    request: &FetchRequest,
) -> Result<(StockSeries, FetchLog)> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(format!(
        "Fetching {} {}min from {}...",
        request.symbol,
        request.period.minutes(),
        fetcher.source_name()
    ));
    pb.enable_steady_tick(Duration::from_millis(120));

    let mut log = FetchLog::new();
    let result = fetcher.fetch_with_log(request, market_now(), &mut log).await;

    match result {
        Ok(series) => {
            pb.finish_with_message(format!("Fetched {} bars", series.len()));
            Ok((series, log))
        }
        Err(e) => {
            pb.abandon_with_message("Fetch failed");
            for line in log.lines() {
                eprintln!("{}", line);
            }
            Err(e).with_context(|| format!("failed to fetch {}", request.symbol))
        }
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "NaN".to_string(), |v| format!("{:.2}", v))
}

/// 최근 `rows`행을 고정폭 표로 렌더링합니다.
pub fn render_rows(series: &StockSeries, rows: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<16} {:>10} {:>10} {:>10} {:>10} {:>14}",
        "datetime", "open", "high", "low", "close", "volume"
    );
    for bar in series.tail(rows) {
        let _ = writeln!(
            out,
            "{:<16} {:>10} {:>10} {:>10} {:>10.2} {:>14}",
            bar.timestamp.format(DISPLAY_DATETIME_FORMAT).to_string(),
            fmt_opt(bar.open),
            fmt_opt(bar.high),
            fmt_opt(bar.low),
            bar.close,
            bar.volume.map_or_else(|| "NaN".to_string(), |v| format!("{:.0}", v)),
        );
    }
    out
}

/// 최근 `rows`행을 JSON 배열로 렌더링합니다.
pub fn render_json(series: &StockSeries, rows: usize) -> Result<String> {
    let data: Vec<JsonRow> = series
        .tail(rows)
        .iter()
        .map(|bar| JsonRow {
            datetime: bar.timestamp.format(DISPLAY_DATETIME_FORMAT).to_string(),
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
        })
        .collect();
    Ok(serde_json::to_string_pretty(&data)?)
}

/// 조회 명령 실행.
pub async fn run_fetch(config: FetchConfig, app: &AppConfig) -> Result<()> {
    let request = build_request(
        &config.symbol,
        &config.market,
        &config.period,
        &config.adjust,
        config.today,
    )?;
    let fetcher = build_fetcher(app)?;

    let (series, log) = fetch_with_progress(&fetcher, &request).await?;
    info!(
        symbol = %request.symbol,
        rows = series.len(),
        retries = log.retry_count(),
        fallback = log.used_fallback(),
        "조회 완료"
    );

    if config.json {
        println!("{}", render_json(&series, config.rows)?);
    } else {
        for line in log.lines() {
            println!("{}", line);
        }
        println!();
        print!("{}", render_rows(&series, config.rows));
    }

    Ok(())
}
