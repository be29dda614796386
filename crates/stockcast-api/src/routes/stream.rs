//! 분봉 조회 진행 상황 SSE endpoint.
//!
//! 이벤트는 모두 `data: {json}` 형식이며 `type` 필드로 구분합니다.
//!
//! ```text
//! open → log(10) → log(70) → log(90) → done
//!                     └──────────────→ error
//! ```

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use stockcast_core::{normalize_symbol, MarketHint};
use stockcast_data::FetchLog;

use crate::error::AppError;
use crate::services::{build_fetch_request, company_name, fetch_series};
use crate::state::AppState;
use crate::view::render_series_table;

/// 스트림 쿼리 파라미터.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamParams {
    #[serde(default = "default_symbol")]
    pub symbol: String,
    #[serde(default = "default_market")]
    pub market: String,
    #[serde(default = "default_period")]
    pub period: String,
    #[serde(default = "default_adjust")]
    pub adjust: String,
    /// "1"이면 당일 데이터만
    #[serde(default)]
    pub today: String,
}

fn default_symbol() -> String {
    "603688".to_string()
}

fn default_market() -> String {
    "auto".to_string()
}

fn default_period() -> String {
    "60".to_string()
}

fn default_adjust() -> String {
    "qfq".to_string()
}

/// SSE 이벤트 본문.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    Open {
        symbol: String,
        company: Option<String>,
    },
    Log {
        text: String,
        progress: u8,
    },
    Done {
        table_html: String,
        company: Option<String>,
        symbol: String,
        table_rows: usize,
    },
    Error {
        text: String,
    },
}

type EventSender = mpsc::Sender<StreamEvent>;

/// 수신 측이 끊기면 `false`.
async fn emit(tx: &EventSender, event: StreamEvent) -> bool {
    tx.send(event).await.is_ok()
}

async fn produce(state: Arc<AppState>, params: StreamParams, tx: EventSender) {
    if let Err(e) = run_stream(&state, &params, &tx).await {
        e.log("/fetch_stream");
        let _ = emit(&tx, StreamEvent::Error { text: e.to_string() }).await;
    }
}

async fn run_stream(
    state: &AppState,
    params: &StreamParams,
    tx: &EventSender,
) -> Result<(), AppError> {
    let symbol = normalize_symbol(&params.symbol, MarketHint::parse_lenient(&params.market));
    let company = if symbol.is_empty() {
        None
    } else {
        company_name(state, &symbol).await
    };

    let open = StreamEvent::Open {
        symbol: symbol.clone(),
        company: company.clone(),
    };
    if !emit(tx, open).await {
        return Ok(());
    }

    let request = build_fetch_request(
        &params.symbol,
        &params.market,
        &params.period,
        &params.adjust,
        params.today == "1",
    )?;

    let start = StreamEvent::Log {
        text: format!(
            "开始获取: {} {}min {}",
            request.symbol,
            request.period.minutes(),
            request.adjust.as_param()
        ),
        progress: 10,
    };
    if !emit(tx, start).await {
        return Ok(());
    }

    let mut log = FetchLog::new();
    let series = fetch_series(state, &request, &mut log).await?;
    for line in log.lines() {
        debug!(symbol = %request.symbol, "{}", line);
    }

    let cleaned = StreamEvent::Log {
        text: format!("清洗完成: {} 行", series.len()),
        progress: 70,
    };
    if !emit(tx, cleaned).await {
        return Ok(());
    }

    let table = render_series_table(&series);
    let rendering = StreamEvent::Log {
        text: "渲染表格...".to_string(),
        progress: 90,
    };
    if !emit(tx, rendering).await {
        return Ok(());
    }

    let done = StreamEvent::Done {
        table_html: table.html,
        company,
        symbol: request.symbol,
        table_rows: table.rows,
    };
    let _ = emit(tx, done).await;
    Ok(())
}

/// GET /fetch_stream
pub async fn fetch_stream(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StreamParams>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let (tx, rx) = mpsc::channel(8);
    tokio::spawn(produce(state, params, tx));

    let events = stream::unfold(rx, |mut rx| async move {
        let event = rx.recv().await?;
        Some((Event::default().json_data(&event), rx))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

/// 스트림 라우터 생성.
pub fn stream_router() -> Router<Arc<AppState>> {
    Router::new().route("/fetch_stream", get(fetch_stream))
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

    async fn collect_events(state: AppState, uri: &str) -> Vec<StreamEvent> {
        let app = stream_router().with_state(Arc::new(state));
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/event-stream"));

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();

        text.split("\n\n")
            .filter_map(|chunk| chunk.strip_prefix("data: "))
            .map(|json| serde_json::from_str(json).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_stream_event_order() {
        let events = collect_events(create_test_state(), "/fetch_stream?symbol=603688").await;
        assert_eq!(events.len(), 5);

        assert_eq!(
            events[0],
            StreamEvent::Open {
                symbol: "sh603688".into(),
                company: Some("测试公司".into()),
            }
        );
        assert_eq!(
            events[1],
            StreamEvent::Log {
                text: "开始获取: sh603688 60min qfq".into(),
                progress: 10,
            }
        );
        assert_eq!(
            events[2],
            StreamEvent::Log {
                text: "清洗完成: 120 行".into(),
                progress: 70,
            }
        );
        assert!(matches!(&events[3], StreamEvent::Log { progress: 90, .. }));
        match &events[4] {
            StreamEvent::Done {
                table_html,
                symbol,
                table_rows,
                ..
            } => {
                assert_eq!(symbol, "sh603688");
                assert_eq!(*table_rows, 120);
                assert!(table_html.starts_with("<table class=\"dataframe\">"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stream_reports_fetch_error() {
        let state = create_test_state_with_source(Arc::new(StaticMarketSource::new(Vec::new())));
        let events = collect_events(state, "/fetch_stream?symbol=000001&period=5").await;

        assert!(matches!(&events[0], StreamEvent::Open { symbol, .. } if symbol == "sz000001"));
        assert!(matches!(&events[1], StreamEvent::Log { progress: 10, .. }));
        assert!(matches!(events.last(), Some(StreamEvent::Error { .. })));
        assert!(!events.iter().any(|e| matches!(e, StreamEvent::Done { .. })));
    }

    #[tokio::test]
    async fn test_stream_rejects_unknown_period() {
        let events = collect_events(create_test_state(), "/fetch_stream?period=7").await;
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], StreamEvent::Open { .. }));
        assert!(matches!(&events[1], StreamEvent::Error { .. }));
    }

    #[tokio::test]
    async fn test_stream_error_is_logged() {
        let counter = WarnCounter::default();
        let _guard = counter.install();

        let params = StreamParams {
            symbol: default_symbol(),
            market: default_market(),
            period: "7".into(),
            adjust: default_adjust(),
            today: String::new(),
        };
        let (tx, mut rx) = mpsc::channel(8);
        produce(Arc::new(create_test_state()), params, tx).await;

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert!(matches!(events.last(), Some(StreamEvent::Error { .. })));
        assert_eq!(counter.count(), 1);
    }
}
