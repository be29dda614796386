//! A주 종목 코드 정규화.
//!
//! 6자리 숫자 코드를 거래소 접두사가 붙은 형식(`sh600000`, `sz000001`)으로
//! 변환합니다. 규칙은 위에서부터 처음 일치하는 것이 적용됩니다:
//!
//! 1. 이미 `sh`/`sz` 접두사가 있으면 그대로 반환
//! 2. 시장 힌트가 지정되고 6자리 숫자이면 힌트의 접두사 적용
//! 3. 자동 판단: 접두사 테이블로 거래소 결정, 일치하지 않으면 기본 거래소
//!
//! 인식할 수 없는 입력은 정리(trim, 소문자화)만 하고 그대로 반환합니다.
//! 정규화는 절대 실패하지 않습니다.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{Exchange, MarketHint};

/// 자동 판단용 코드 접두사 규칙.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefixRule {
    /// 코드 앞 3자리
    pub code_prefix: &'static str,
    /// 매핑되는 거래소
    pub exchange: Exchange,
}

/// 기본 접두사 테이블.
///
/// 상하이: 主板 600/601/603/605, 科创板 688/689.
/// 선전: 主板 000/001, 中小板 002/003, 创业板 300/301.
pub const DEFAULT_PREFIX_RULES: &[PrefixRule] = &[
    PrefixRule { code_prefix: "600", exchange: Exchange::Shanghai },
    PrefixRule { code_prefix: "601", exchange: Exchange::Shanghai },
    PrefixRule { code_prefix: "603", exchange: Exchange::Shanghai },
    PrefixRule { code_prefix: "605", exchange: Exchange::Shanghai },
    PrefixRule { code_prefix: "688", exchange: Exchange::Shanghai },
    PrefixRule { code_prefix: "689", exchange: Exchange::Shanghai },
    PrefixRule { code_prefix: "000", exchange: Exchange::Shenzhen },
    PrefixRule { code_prefix: "001", exchange: Exchange::Shenzhen },
    PrefixRule { code_prefix: "002", exchange: Exchange::Shenzhen },
    PrefixRule { code_prefix: "003", exchange: Exchange::Shenzhen },
    PrefixRule { code_prefix: "300", exchange: Exchange::Shenzhen },
    PrefixRule { code_prefix: "301", exchange: Exchange::Shenzhen },
];

/// 창업판(cyb) 힌트 처리 방식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThirdBoardPolicy {
    /// 선전 접두사로 취급
    #[default]
    Shenzhen,
    /// 지원하지 않음 (입력 그대로 반환)
    PassThrough,
}

/// 정규화 정책.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizerPolicy {
    /// 자동 판단 접두사 테이블
    pub prefix_rules: &'static [PrefixRule],
    /// 테이블에 없는 6자리 코드의 거래소
    pub fallback: Exchange,
    /// 창업판 힌트 처리
    pub third_board: ThirdBoardPolicy,
}

impl Default for NormalizerPolicy {
    fn default() -> Self {
        Self {
            prefix_rules: DEFAULT_PREFIX_RULES,
            fallback: Exchange::Shenzhen,
            third_board: ThirdBoardPolicy::Shenzhen,
        }
    }
}

/// 종목 코드 정규화기.
#[derive(Debug, Clone, Default)]
pub struct SymbolNormalizer {
    policy: NormalizerPolicy,
}

impl SymbolNormalizer {
    /// 정책으로 정규화기를 생성합니다.
    pub fn new(policy: NormalizerPolicy) -> Self {
        Self { policy }
    }

    /// 현재 정책.
    pub fn policy(&self) -> &NormalizerPolicy {
        &self.policy
    }

    /// 원시 입력과 시장 힌트로 정규화된 종목 코드를 반환합니다.
    pub fn normalize(&self, raw: &str, hint: MarketHint) -> String {
        let s = raw.trim().to_lowercase();
        if s.is_empty() {
            return s;
        }

        // 규칙 1: 이미 접두사가 있음
        if s.starts_with("sh") || s.starts_with("sz") {
            return s;
        }

        if !is_six_digit_code(&s) {
            return s;
        }

        // 규칙 2: 명시적 시장 힌트
        match hint {
            MarketHint::Sh => return format!("{}{}", Exchange::Shanghai.prefix(), s),
            MarketHint::Sz => return format!("{}{}", Exchange::Shenzhen.prefix(), s),
            MarketHint::Cyb => match self.policy.third_board {
                ThirdBoardPolicy::Shenzhen => {
                    return format!("{}{}", Exchange::Shenzhen.prefix(), s)
                }
                ThirdBoardPolicy::PassThrough => return s,
            },
            MarketHint::Bj => return s,
            MarketHint::Auto => {}
        }

        // 규칙 3: 접두사 테이블
        let exchange = self.classify(&s);
        format!("{}{}", exchange.prefix(), s)
    }

    /// 6자리 코드의 거래소를 판단합니다.
    pub fn classify(&self, code: &str) -> Exchange {
        self.policy
            .prefix_rules
            .iter()
            .find(|rule| code.starts_with(rule.code_prefix))
            .map(|rule| rule.exchange)
            .unwrap_or(self.policy.fallback)
    }
}

/// 기본 정책으로 종목 코드를 정규화합니다.
///
/// # 예제
///
/// ```
/// use stockcast_core::{normalize_symbol, MarketHint};
///
/// assert_eq!(normalize_symbol("603688", MarketHint::Auto), "sh603688");
/// assert_eq!(normalize_symbol("300750", MarketHint::Auto), "sz300750");
/// assert_eq!(normalize_symbol("SZ000001", MarketHint::Sh), "sz000001");
/// ```
pub fn normalize_symbol(raw: &str, hint: MarketHint) -> String {
    SymbolNormalizer::default().normalize(raw, hint)
}

fn is_six_digit_code(s: &str) -> bool {
    s.len() == 6 && s.bytes().all(|b| b.is_ascii_digit())
}

/// 거래소가 확정된 종목 코드.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    exchange: Exchange,
    code: String,
}

impl Symbol {
    /// `sh600000` 형식의 문자열을 파싱합니다.
    pub fn parse(normalized: &str) -> Option<Self> {
        if normalized.len() != 8 || !normalized.is_ascii() {
            return None;
        }
        let (prefix, code) = normalized.split_at(2);
        let exchange = Exchange::from_prefix(prefix)?;
        if !is_six_digit_code(code) {
            return None;
        }
        Some(Self {
            exchange,
            code: code.to_string(),
        })
    }

    /// 거래소.
    pub fn exchange(&self) -> Exchange {
        self.exchange
    }

    /// 접두사 없는 6자리 코드.
    pub fn code(&self) -> &str {
        &self.code
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.exchange.prefix(), self.code)
    }
}
