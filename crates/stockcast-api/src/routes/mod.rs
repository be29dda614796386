//! HTTP 라우트.
//!
//! # 라우트 구조
//!
//! - `/` - 서버 렌더링 페이지 (GET/POST)
//! - `/fetch_stream` - 분봉 조회 진행 상황 (SSE)
//! - `/api/fetch` - 분봉 조회 (JSON)
//! - `/api/predict` - 종가 예측 (JSON)
//! - `/health` - 헬스 체크 (liveness)
//! - `/health/ready` - 상세 헬스 체크 (readiness)
//!
//! `/metrics`는 별도 상태를 쓰므로 바이너리에서 합칩니다.

pub mod fetch;
pub mod health;
pub mod page;
pub mod predict;
pub mod stream;

pub use fetch::{fetch_router, BarRow, FetchApiRequest, FetchApiResponse};
pub use health::{health_router, ComponentHealth, ComponentStatus, HealthResponse};
pub use page::{page_router, PageParams};
pub use predict::{predict_router, PredictApiRequest, PredictApiResponse};
pub use stream::{stream_router, StreamEvent, StreamParams};

use axum::Router;
use std::sync::Arc;

use crate::state::AppState;

/// 전체 라우터 생성.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(page_router())
        .merge(stream_router())
        .merge(fetch_router())
        .merge(predict_router())
        .nest("/health", health_router())
}
