//! # Stockcast Core
//!
//! A주 분봉 예측 애플리케이션의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 시스템 전반에서 사용되는 기본 타입을 제공합니다:
//! - 분봉(Bar) 및 시계열(StockSeries) 구조체
//! - 봉 주기, 수정주가 방식, 시장 힌트 정의
//! - 종목 코드 정규화 규칙
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod error;
pub mod logging;
pub mod symbol;
pub mod types;

pub use config::*;
pub use error::*;
pub use logging::*;
pub use symbol::{normalize_symbol, NormalizerPolicy, Symbol, SymbolNormalizer, ThirdBoardPolicy};
pub use types::*;
