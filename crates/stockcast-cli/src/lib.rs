//! CLI 도구 모음.
//!
//! 이 crate는 다음 기능을 제공합니다:
//! - 종목 코드 정규화 확인
//! - 분봉 조회 (표/JSON 출력)
//! - 종가 예측과 차트 저장
//! - 적용 중인 설정 출력

pub mod commands;

pub use commands::*;
