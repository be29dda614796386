//! 예측 JSON endpoint.
//!
//! POST /api/predict
//!
//! 클라이언트가 `/api/fetch`로 받은 행을 그대로 돌려보내면 종가로 예측합니다.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{Method, Uri},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use stockcast_analytics::encode_base64;
use stockcast_core::BarPeriod;

use crate::error::{ApiResult, AppError};
use crate::services::{plan_horizon, run_forecast};
use crate::state::AppState;
use crate::utils::{format_percent, format_price};

/// 예측 요청.
#[derive(Debug, Clone, Deserialize)]
pub struct PredictApiRequest {
    #[serde(default = "default_lookback")]
    pub lookback: usize,
    #[serde(default = "default_horizon")]
    pub horizon: usize,
    #[serde(default = "default_next3")]
    pub next3: bool,
    #[serde(default = "default_period")]
    pub period: BarPeriod,
    #[serde(default)]
    pub data: Vec<PredictRow>,
}

fn default_lookback() -> usize {
    200
}

fn default_horizon() -> usize {
    12
}

fn default_next3() -> bool {
    true
}

fn default_period() -> BarPeriod {
    BarPeriod::M60
}

/// 입력 행. 종가 외 필드는 무시합니다.
#[derive(Debug, Clone, Deserialize)]
pub struct PredictRow {
    #[serde(default)]
    pub datetime: Option<String>,
    #[serde(default)]
    pub close: Option<f64>,
}

/// 예측 응답. 모든 값은 표시용 문자열입니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictApiResponse {
    pub current_price: String,
    pub trend: String,
    pub volatility: String,
    pub max_gain: String,
    pub max_loss: String,
    pub upper_price: String,
    pub lower_price: String,
    /// base64 PNG
    pub chart: String,
}

async fn handle_predict(
    state: &AppState,
    req: PredictApiRequest,
) -> Result<PredictApiResponse, AppError> {
    if req.data.is_empty() {
        return Err(AppError::BadRequest("没有数据可供预测".to_string()));
    }

    let closes: Vec<f64> = req
        .data
        .iter()
        .filter_map(|row| row.close)
        .filter(|c| c.is_finite())
        .collect();

    let plan = plan_horizon(state, req.next3, req.period, req.horizon)?;
    let outcome = run_forecast(state, &closes, req.lookback, &plan).await?;
    let summary = &outcome.summary;

    Ok(PredictApiResponse {
        current_price: format_price(summary.current_price),
        trend: summary.trend.label().to_string(),
        volatility: format_percent(summary.volatility, true),
        max_gain: format_percent(summary.max_gain, true),
        max_loss: format_percent(summary.max_loss, true),
        upper_price: format_price(summary.upper_price),
        lower_price: format_price(summary.lower_price),
        chart: outcome
            .chart_png
            .as_deref()
            .map(encode_base64)
            .unwrap_or_default(),
    })
}

/// 종가 시계열을 예측하고 요약과 차트를 반환합니다.
pub async fn api_predict(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    payload: Result<Json<PredictApiRequest>, JsonRejection>,
) -> ApiResult<Json<PredictApiResponse>> {
    let result = match payload {
        Ok(Json(req)) => handle_predict(&state, req).await,
        Err(rejection) => Err(AppError::BadRequest(rejection.body_text())),
    };

    result
        .map(Json)
        .map_err(|e| e.into_response_parts(&method, &uri))
}

/// 예측 라우터 생성.
pub fn predict_router() -> Router<Arc<AppState>> {
    Router::new().route("/api/predict", post(api_predict))
}
