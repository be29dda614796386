//! 분봉 조회 JSON endpoint.
//!
//! POST /api/fetch

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{Method, Uri},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use stockcast_core::{Bar, BarPeriod, DataAmount};
use stockcast_data::FetchLog;

use crate::error::{ApiResult, AppError};
use crate::services::{build_fetch_request, company_name, fetch_series};
use crate::state::AppState;
use crate::utils::format_bar_time;

/// 조회 요청.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchApiRequest {
    #[serde(default)]
    pub symbol: String,
    #[serde(default = "default_market")]
    pub market: String,
    #[serde(default = "default_period")]
    pub period: BarPeriod,
    #[serde(default = "default_adjust")]
    pub adjust: String,
    #[serde(default)]
    pub today: bool,
    #[serde(default)]
    pub data_amount: DataAmount,
}

fn default_market() -> String {
    "auto".to_string()
}

fn default_period() -> BarPeriod {
    BarPeriod::M60
}

fn default_adjust() -> String {
    "qfq".to_string()
}

/// 분봉 한 행.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BarRow {
    /// `YYYY-MM-DD HH:MM`
    pub datetime: String,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: f64,
    pub volume: Option<f64>,
}

impl From<&Bar> for BarRow {
    fn from(bar: &Bar) -> Self {
        Self {
            datetime: format_bar_time(&bar.timestamp),
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
        }
    }
}

/// 조회 응답.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchApiResponse {
    pub company: Option<String>,
    pub symbol: String,
    pub data: Vec<BarRow>,
}

async fn handle_fetch(state: &AppState, req: FetchApiRequest) -> Result<FetchApiResponse, AppError> {
    let request = build_fetch_request(
        &req.symbol,
        &req.market,
        &req.period.as_param(),
        &req.adjust,
        req.today,
    )?;

    let company = company_name(state, &request.symbol).await;

    let mut log = FetchLog::new();
    let series = fetch_series(state, &request, &mut log).await?;

    let limit = req.data_amount.row_limit(request.period, series.len());
    let data = series.tail(limit).iter().map(BarRow::from).collect();

    Ok(FetchApiResponse {
        company,
        symbol: request.symbol,
        data,
    })
}

/// 분봉을 조회해 최근 행을 JSON으로 반환합니다.
pub async fn api_fetch(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    payload: Result<Json<FetchApiRequest>, JsonRejection>,
) -> ApiResult<Json<FetchApiResponse>> {
    let result = match payload {
        Ok(Json(req)) => handle_fetch(&state, req).await,
        Err(rejection) => Err(AppError::BadRequest(rejection.body_text())),
    };

    result
        .map(Json)
        .map_err(|e| e.into_response_parts(&method, &uri))
}

/// 조회 라우터 생성.
pub fn fetch_router() -> Router<Arc<AppState>> {
    Router::new().route("/api/fetch", post(api_fetch))
}
