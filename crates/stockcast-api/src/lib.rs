//! 분봉 예측 웹 서버.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - 서버 렌더링 페이지 (조회/예측 폼, 테이블, 차트)
//! - 조회 진행 상황 SSE 스트림
//! - JSON API (`/api/fetch`, `/api/predict`)
//! - 헬스 체크 엔드포인트
//! - Prometheus 메트릭
//!
//! # 모듈 구성
//!
//! - [`state`]: 애플리케이션 공유 상태 (AppState)
//! - [`routes`]: HTTP 엔드포인트
//! - [`services`]: 핸들러가 공유하는 수집/예측 처리
//! - [`view`]: HTML 렌더링
//! - [`metrics`]: Prometheus 메트릭 수집
//! - [`middleware`]: HTTP 미들웨어

pub mod error;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;
pub mod view;

pub use error::{ApiErrorResponse, ApiResult, AppError};
pub use metrics::setup_metrics_recorder;
pub use middleware::metrics_layer;
pub use routes::*;
pub use state::AppState;

#[cfg(any(test, feature = "test-utils"))]
pub use state::{create_test_state, create_test_state_with_source};
