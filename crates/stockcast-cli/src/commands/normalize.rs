//! 종목 코드 정규화 명령어.

use stockcast_core::{normalize_symbol, MarketHint, Symbol};

/// 정규화 결과.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeOutput {
    /// 정규화된 코드 (변환 불가하면 입력 그대로)
    pub normalized: String,
    /// 거래소 접두사 (`sh`/`sz`), 인식하지 못하면 `None`
    pub exchange: Option<&'static str>,
}

/// 종목 코드를 정규화합니다.
pub fn normalize(raw: &str, market: &str) -> NormalizeOutput {
    let normalized = normalize_symbol(raw, MarketHint::parse_lenient(market));
    let exchange = Symbol::parse(&normalized).map(|s| s.exchange().prefix());
    NormalizeOutput {
        normalized,
        exchange,
    }
}

/// 결과를 한 줄로 출력합니다.
pub fn run_normalize(raw: &str, market: &str) {
    let output = normalize(raw, market);
    match output.exchange {
        Some(exchange) => println!("{} ({})", output.normalized, exchange),
        None => println!("{} (unrecognized)", output.normalized),
    }
}
