//! 분봉 예측 CLI.
//!
//! # 사용 예시
//!
//! ```bash
//! # 종목 코드 정규화 확인
//! stockcast normalize 603688
//!
//! # 최근 60분봉 20행 조회 (前复权)
//! stockcast fetch 000001 -p 60 -a qfq --rows 20
//!
//! # 후 3거래일 예측 후 차트 저장
//! stockcast predict 603688 --next3 --chart forecast.png
//!
//! # 적용 중인 설정 출력
//! stockcast config
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::warn;

use stockcast_cli::commands::config::run_config;
use stockcast_cli::commands::fetch::{run_fetch, FetchConfig};
use stockcast_cli::commands::normalize::run_normalize;
use stockcast_cli::commands::predict::{run_predict, PredictConfig};
use stockcast_core::{init_logging, AppConfig, LogConfig};

#[derive(Parser)]
#[command(name = "stockcast")]
#[command(about = "A-share minute-bar fetch and forecast CLI", long_about = None)]
#[command(version)]
struct Cli {
    /// 설정 파일 경로
    #[arg(short, long, global = true, env = "CONFIG_PATH", default_value = "config/default.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 종목 코드 정규화 (예: 603688 → sh603688)
    Normalize {
        /// 종목 코드
        symbol: String,

        /// 시장 (auto, sh, sz, cyb, bj)
        #[arg(short, long, default_value = "auto")]
        market: String,
    },

    /// 분봉 조회
    Fetch {
        /// 종목 코드
        symbol: String,

        /// 시장 (auto, sh, sz, cyb, bj)
        #[arg(short, long, default_value = "auto")]
        market: String,

        /// 봉 주기 (1, 5, 15, 30, 60분)
        #[arg(short, long, default_value = "60")]
        period: String,

        /// 수정주가 방식 ("", qfq, hfq)
        #[arg(short, long, default_value = "qfq")]
        adjust: String,

        /// 당일 데이터만
        #[arg(long)]
        today: bool,

        /// 출력할 최근 행 수
        #[arg(short, long, default_value = "20")]
        rows: usize,

        /// JSON으로 출력
        #[arg(long)]
        json: bool,
    },

    /// 종가 예측
    Predict {
        /// 종목 코드
        symbol: String,

        /// 시장 (auto, sh, sz, cyb, bj)
        #[arg(short, long, default_value = "auto")]
        market: String,

        /// 봉 주기 (1, 5, 15, 30, 60분)
        #[arg(short, long, default_value = "60")]
        period: String,

        /// 수정주가 방식 ("", qfq, hfq)
        #[arg(short, long, default_value = "qfq")]
        adjust: String,

        /// 모델에 넣을 최근 종가 수
        #[arg(short, long, default_value = "100")]
        lookback: usize,

        /// 예측 시점 수 (--next3이면 무시)
        #[arg(long, default_value = "12")]
        horizon: usize,

        /// 후 3거래일 분량을 예측
        #[arg(long)]
        next3: bool,

        /// 차트 PNG 저장 경로
        #[arg(long)]
        chart: Option<PathBuf>,
    },

    /// 적용 중인 설정을 TOML로 출력
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config_exists = cli.config.exists();
    let config = AppConfig::load(&cli.config)?;

    if let Err(e) = init_logging(LogConfig::from_config(&config.logging)) {
        eprintln!("failed to initialize logging: {}", e);
    }
    if !config_exists {
        warn!(path = %cli.config.display(), "설정 파일이 없어 기본값을 사용합니다");
    }

    match cli.command {
        Commands::Normalize { symbol, market } => {
            run_normalize(&symbol, &market);
        }
        Commands::Fetch {
            symbol,
            market,
            period,
            adjust,
            today,
            rows,
            json,
        } => {
            let fetch = FetchConfig {
                symbol,
                market,
                period,
                adjust,
                today,
                rows,
                json,
            };
            run_fetch(fetch, &config).await?;
        }
        Commands::Predict {
            symbol,
            market,
            period,
            adjust,
            lookback,
            horizon,
            next3,
            chart,
        } => {
            let predict = PredictConfig {
                symbol,
                market,
                period,
                adjust,
                lookback,
                horizon,
                next3,
                chart,
            };
            run_predict(predict, &config).await?;
        }
        Commands::Config => {
            run_config(&config)?;
        }
    }

    Ok(())
}
