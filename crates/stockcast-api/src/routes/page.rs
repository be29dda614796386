//! 서버 렌더링 페이지 endpoint.
//!
//! `GET /`와 `POST /`는 같은 파라미터를 받습니다. POST는 폼 값이 쿼리
//! 값보다 우선합니다. 처리 중 에러는 페이지 안에 표시하며 상태 코드는
//! 항상 200입니다.

use axum::{
    extract::{Query, State},
    response::Html,
    routing::get,
    Form, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use stockcast_analytics::encode_base64;
use stockcast_data::FetchLog;

use crate::error::AppError;
use crate::services::{build_fetch_request, fetch_series, plan_horizon, run_forecast};
use crate::state::AppState;
use crate::utils::{format_percent, format_price};
use crate::view::{render_page, render_series_table, PageView, StatsView};

const DEFAULT_SYMBOL: &str = "603688";
const DEFAULT_LOOKBACK: usize = 100;
const DEFAULT_HORIZON: usize = 12;

/// 페이지 파라미터. 모든 값은 문자열 그대로 받습니다.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    pub symbol: Option<String>,
    pub market: Option<String>,
    pub period: Option<String>,
    pub adjust: Option<String>,
    pub today: Option<String>,
    pub lookback: Option<String>,
    pub horizon: Option<String>,
    pub next3: Option<String>,
    pub action: Option<String>,
}

impl PageParams {
    /// 비어 있지 않은 `self` 값을 우선해 병합합니다.
    #[must_use]
    pub fn or(self, fallback: PageParams) -> PageParams {
        fn pick(primary: Option<String>, fallback: Option<String>) -> Option<String> {
            match primary {
                Some(v) if !v.is_empty() => Some(v),
                // 빈 값은 대체 값이 없을 때만 유지 (adjust="" 등)
                other => fallback.or(other),
            }
        }

        PageParams {
            symbol: pick(self.symbol, fallback.symbol),
            market: pick(self.market, fallback.market),
            period: pick(self.period, fallback.period),
            adjust: pick(self.adjust, fallback.adjust),
            today: pick(self.today, fallback.today),
            lookback: pick(self.lookback, fallback.lookback),
            horizon: pick(self.horizon, fallback.horizon),
            next3: pick(self.next3, fallback.next3),
            action: pick(self.action, fallback.action),
        }
    }
}

fn is_checked(value: Option<&str>) -> bool {
    matches!(value, Some("1" | "true" | "on"))
}

fn parse_count(name: &str, value: &str) -> Result<usize, AppError> {
    value
        .trim()
        .parse::<usize>()
        .map_err(|_| AppError::BadRequest(format!("参数 {} 必须是正整数: {}", name, value)))
}

/// 페이지 요청 처리.
///
/// `action`이 `fetch` 또는 `predict`일 때만 데이터를 조회합니다.
pub async fn render(state: &AppState, params: PageParams) -> String {
    // adjust는 빈 문자열(不复权)도 유효한 값
    let adjust = params.adjust.clone().unwrap_or_else(|| "qfq".to_string());
    let action = params.action.clone().unwrap_or_else(|| "data".to_string());
    // 체크박스는 해제되면 전송되지 않으므로 폼 제출 전만 기본값 적용
    let next3 = match params.next3.as_deref() {
        Some(v) => is_checked(Some(v)),
        None => params.action.is_none(),
    };

    let mut view = PageView {
        symbol: params
            .symbol
            .clone()
            .unwrap_or_else(|| DEFAULT_SYMBOL.to_string()),
        market: params.market.clone().unwrap_or_else(|| "auto".to_string()),
        period: params.period.clone().unwrap_or_else(|| "60".to_string()),
        adjust,
        today: is_checked(params.today.as_deref()),
        lookback: params
            .lookback
            .clone()
            .unwrap_or_else(|| DEFAULT_LOOKBACK.to_string()),
        horizon: params
            .horizon
            .clone()
            .unwrap_or_else(|| DEFAULT_HORIZON.to_string()),
        next3,
        ..Default::default()
    };

    if action == "fetch" || action == "predict" {
        if let Err(e) = run_action(state, &mut view, action == "predict").await {
            e.log("/");
            let message = e.to_string();
            view.logs.push(format!("[error] {}", message));
            view.error = Some(message);
        }
    }

    render_page(&view)
}

async fn run_action(state: &AppState, view: &mut PageView, predict: bool) -> Result<(), AppError> {
    let request = build_fetch_request(
        &view.symbol,
        &view.market,
        &view.period,
        &view.adjust,
        view.today,
    )?;

    let mut log = FetchLog::new();
    let result = fetch_series(state, &request, &mut log).await;
    view.logs.extend(log.lines());
    let series = result?;

    view.table = Some(render_series_table(&series));

    if !predict {
        return Ok(());
    }

    let lookback = parse_count("lookback", &view.lookback)?;
    let horizon = parse_count("horizon", &view.horizon)?;
    view.logs.push(format!(
        "[predict] 开始预测: lookback={}, horizon={}",
        lookback, horizon
    ));

    let plan = plan_horizon(state, view.next3, request.period, horizon)?;
    let outcome = run_forecast(state, &series.closes(), lookback, &plan).await?;
    let summary = &outcome.summary;

    view.stats = Some(StatsView {
        chart_base64: outcome
            .chart_png
            .as_deref()
            .map(encode_base64)
            .unwrap_or_default(),
        current_price: format_price(summary.current_price),
        trend: summary.trend.label().to_string(),
        volatility: format_percent(summary.volatility, false),
        max_gain: format_percent(summary.max_gain, false),
        max_loss: format_percent(summary.max_loss, false),
        gain_price: format_price(summary.gain_price()),
        loss_price: format_price(summary.loss_price()),
    });
    view.logs.push("[predict] 预测完成".to_string());

    info!(symbol = %request.symbol, steps = plan.steps, "페이지 예측 완료");
    Ok(())
}

/// GET /
pub async fn page_get(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageParams>,
) -> Html<String> {
    Html(render(&state, query).await)
}

/// POST /
pub async fn page_post(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageParams>,
    Form(form): Form<PageParams>,
) -> Html<String> {
    Html(render(&state, form.or(query)).await)
}

/// 페이지 라우터 생성.
pub fn page_router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(page_get).post(page_post))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::log_capture::WarnCounter;
    use crate::state::{create_test_state, create_test_state_with_source};
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use stockcast_data::StaticMarketSource;
    use tower::ServiceExt;

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn app(state: AppState) -> Router {
        page_router().with_state(Arc::new(state))
    }

    #[tokio::test]
    async fn test_initial_page_has_form_only() {
        let response = app(create_test_state())
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("TimesFM 股票预测"));
        assert!(html.contains("name=\"symbol\" value=\"603688\""));
        assert!(html.contains("name=\"next3\" value=\"1\" checked"));
        assert!(!html.contains("<table class=\"dataframe\">"));
    }

    #[tokio::test]
    async fn test_fetch_action_renders_table() {
        let response = app(create_test_state())
            .oneshot(
                Request::builder()
                    .uri("/?symbol=603688&action=fetch&period=60")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("<table class=\"dataframe\">"));
        assert!(html.contains("数据表格（最近 120 行）"));
        assert!(html.contains("[fetch] 请求: symbol=sh603688"));
        assert!(!html.contains("data:image/png;base64"));
    }

    #[tokio::test]
    async fn test_predict_action_renders_stats() {
        let response = app(create_test_state())
            .oneshot(
                Request::builder()
                    .uri("/?action=predict&lookback=50&horizon=5")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let html = body_text(response).await;
        assert!(html.contains("data:image/png;base64,"));
        assert!(html.contains("趋势：<b>上升</b>"));
        assert!(html.contains("[predict] 开始预测: lookback=50, horizon=5"));
        assert!(html.contains("[predict] 预测完成"));
        // 체크박스가 전송되지 않았으므로 next3 해제
        assert!(!html.contains("name=\"next3\" value=\"1\" checked"));
    }

    #[tokio::test]
    async fn test_post_form_overrides_query() {
        let response = app(create_test_state())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/?symbol=000001&action=data")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("symbol=600519&action=fetch"))
                    .unwrap(),
            )
            .await
            .unwrap();

        let html = body_text(response).await;
        assert!(html.contains("name=\"symbol\" value=\"600519\""));
        assert!(html.contains("[fetch] 请求: symbol=sh600519"));
    }

    #[tokio::test]
    async fn test_errors_are_inline_with_ok_status() {
        let state = create_test_state_with_source(Arc::new(StaticMarketSource::new(Vec::new())));
        let response = app(state)
            .oneshot(
                Request::builder()
                    .uri("/?action=fetch")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("class=\"error\""));
        assert!(html.contains("[error] "));
    }

    #[tokio::test]
    async fn test_invalid_lookback_is_inline_error() {
        let response = app(create_test_state())
            .oneshot(
                Request::builder()
                    .uri("/?action=predict&lookback=abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("参数 lookback 必须是正整数"));
        // 조회는 성공했으므로 테이블은 남음
        assert!(html.contains("<table class=\"dataframe\">"));
    }

    #[tokio::test]
    async fn test_inline_errors_are_logged() {
        let counter = WarnCounter::default();
        let _guard = counter.install();
        let state = create_test_state();

        let ok = PageParams {
            action: Some("fetch".into()),
            ..Default::default()
        };
        render(&state, ok).await;
        assert_eq!(counter.count(), 0);

        // lookback 5 < 최소 10개
        let short = PageParams {
            action: Some("predict".into()),
            lookback: Some("5".into()),
            ..Default::default()
        };
        let html = render(&state, short).await;
        assert!(html.contains("class=\"error\""));
        assert_eq!(counter.count(), 1);
    }

    #[test]
    fn test_params_merge_skips_empty_values() {
        let form = PageParams {
            symbol: Some(String::new()),
            action: Some("fetch".into()),
            ..Default::default()
        };
        let query = PageParams {
            symbol: Some("000001".into()),
            action: Some("data".into()),
            ..Default::default()
        };
        let merged = form.or(query);
        assert_eq!(merged.symbol.as_deref(), Some("000001"));
        assert_eq!(merged.action.as_deref(), Some("fetch"));

        let form = PageParams {
            adjust: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(form.or(PageParams::default()).adjust.as_deref(), Some(""));
    }
}
