//! 예측 명령어.
//!
//! 분봉을 조회한 뒤 종가로 예측하고 요약을 출력합니다. `--chart`를 주면
//! PNG 차트를 파일로 저장합니다.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use stockcast_analytics::{
    resolve_horizon, ChartOptions, ForecastOutcome, ForecastService, ForecasterConfig,
};
use stockcast_core::{AppConfig, BarPeriod};

use super::fetch::{build_fetcher, build_request, fetch_with_progress};

/// 예측 명령 설정.
#[derive(Debug, Clone)]
pub struct PredictConfig {
    pub symbol: String,
    pub market: String,
    pub period: String,
    pub adjust: String,
    pub lookback: usize,
    pub horizon: usize,
    pub next3: bool,
    /// 차트 PNG 저장 경로
    pub chart: Option<PathBuf>,
}

/// 예측 결과 요약을 사람이 읽는 형식으로 렌더링합니다.
pub fn format_summary(outcome: &ForecastOutcome) -> String {
    let s = &outcome.summary;
    let mut out = String::new();
    let _ = writeln!(out, "model:          {}", outcome.model_name);
    let _ = writeln!(
        out,
        "horizon:        {} steps{}",
        outcome.plan.steps,
        if outcome.plan.clamped {
            format!(" (clamped from {})", outcome.plan.requested)
        } else {
            String::new()
        }
    );
    let _ = writeln!(out, "current price:  {:.2}", s.current_price);
    let _ = writeln!(out, "trend:          {}", s.trend);
    let _ = writeln!(out, "volatility:     {:.2}%", s.volatility);
    let _ = writeln!(out, "max gain:       {:.2}% ({:.2})", s.max_gain, s.gain_price());
    let _ = writeln!(out, "max loss:       {:.2}% ({:.2})", s.max_loss, s.loss_price());
    let _ = writeln!(
        out,
        "band:           {:.2} ~ {:.2}",
        s.lower_price, s.upper_price
    );
    out
}

/// 예측 서비스로 예측하고, 경로가 있으면 차트를 저장합니다.
pub async fn forecast_series(
    service: &ForecastService,
    closes: &[f64],
    config: &PredictConfig,
    period: BarPeriod,
    chart: ChartOptions,
) -> Result<ForecastOutcome> {
    let plan = resolve_horizon(
        config.next3,
        period,
        config.horizon,
        service.config().max_horizon,
    )?;

    let outcome = match &config.chart {
        Some(path) => {
            let outcome = service
                .forecast_with_chart(closes, config.lookback, &plan, chart)
                .await?;
            if let Some(png) = &outcome.chart_png {
                std::fs::write(path, png)
                    .with_context(|| format!("failed to write chart to {}", path.display()))?;
            }
            outcome
        }
        None => service.forecast(closes, config.lookback, &plan).await?,
    };

    Ok(outcome)
}

/// 예측 명령 실행.
pub async fn run_predict(config: PredictConfig, app: &AppConfig) -> Result<()> {
    let request = build_request(
        &config.symbol,
        &config.market,
        &config.period,
        &config.adjust,
        false,
    )?;
    let fetcher = build_fetcher(app)?;
    let (series, _log) = fetch_with_progress(&fetcher, &request).await?;

    let service = ForecastService::new(ForecasterConfig::from_model_config(&app.model)?);

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(format!("Running {}...", service.config().model_name));
    pb.enable_steady_tick(Duration::from_millis(120));

    let result = forecast_series(
        &service,
        &series.closes(),
        &config,
        request.period,
        ChartOptions::from(&app.chart),
    )
    .await;

    let outcome = match result {
        Ok(outcome) => {
            pb.finish_with_message(format!(
                "Forecast done in {:.1}s",
                outcome.elapsed.as_secs_f64()
            ));
            outcome
        }
        Err(e) => {
            pb.abandon_with_message("Forecast failed");
            return Err(e);
        }
    };

    info!(
        symbol = %request.symbol,
        steps = outcome.plan.steps,
        trend = %outcome.summary.trend,
        "예측 완료"
    );

    println!("symbol:         {}", request.symbol);
    print!("{}", format_summary(&outcome));
    if let Some(path) = &config.chart {
        println!("chart:          {}", path.display());
    }

    Ok(())
}
