//! 거래소, 시장 힌트, 수정주가 방식.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// A주 거래소.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exchange {
    /// 상하이 증권거래소 (sh)
    Shanghai,
    /// 선전 증권거래소 (sz)
    Shenzhen,
}

impl Exchange {
    /// 종목 코드 접두사 ("sh" / "sz").
    pub fn prefix(&self) -> &'static str {
        match self {
            Exchange::Shanghai => "sh",
            Exchange::Shenzhen => "sz",
        }
    }

    /// 접두사에서 거래소를 찾습니다.
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "sh" => Some(Exchange::Shanghai),
            "sz" => Some(Exchange::Shenzhen),
            _ => None,
        }
    }

    /// EastMoney `secid` 시장 번호 (상하이=1, 선전=0).
    pub fn eastmoney_market_id(&self) -> u8 {
        match self {
            Exchange::Shanghai => 1,
            Exchange::Shenzhen => 0,
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// 사용자가 선택한 시장 힌트.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketHint {
    /// 코드 범위로 자동 판단
    #[default]
    Auto,
    /// 상하이
    Sh,
    /// 선전
    Sz,
    /// 창업판 (ChiNext)
    Cyb,
    /// 베이징 증권거래소
    Bj,
}

impl MarketHint {
    /// 폼 값 문자열.
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketHint::Auto => "auto",
            MarketHint::Sh => "sh",
            MarketHint::Sz => "sz",
            MarketHint::Cyb => "cyb",
            MarketHint::Bj => "bj",
        }
    }

    /// 문자열에서 파싱합니다. 알 수 없는 값은 `Auto`로 취급합니다.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "sh" => MarketHint::Sh,
            "sz" => MarketHint::Sz,
            "cyb" => MarketHint::Cyb,
            "bj" => MarketHint::Bj,
            _ => MarketHint::Auto,
        }
    }
}

impl fmt::Display for MarketHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 수정주가 방식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Adjust {
    /// 수정 없음
    #[default]
    #[serde(rename = "")]
    None,
    /// 전방 수정 (前复权)
    Qfq,
    /// 후방 수정 (后复权)
    Hfq,
}

impl Adjust {
    /// 업스트림 파라미터 값 ("" / "qfq" / "hfq").
    pub fn as_param(&self) -> &'static str {
        match self {
            Adjust::None => "",
            Adjust::Qfq => "qfq",
            Adjust::Hfq => "hfq",
        }
    }

    /// 화면 표시용 이름.
    pub fn label(&self) -> &'static str {
        match self {
            Adjust::None => "不复权",
            Adjust::Qfq => "前复权",
            Adjust::Hfq => "后复权",
        }
    }

    /// 수정주가가 요청되었는지 확인합니다.
    pub fn is_adjusted(&self) -> bool {
        !matches!(self, Adjust::None)
    }
}

impl fmt::Display for Adjust {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Adjust::None => f.write_str("none"),
            other => f.write_str(other.as_param()),
        }
    }
}

impl FromStr for Adjust {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" => Ok(Adjust::None),
            "qfq" => Ok(Adjust::Qfq),
            "hfq" => Ok(Adjust::Hfq),
            other => Err(CoreError::InvalidInput(format!("알 수 없는 수정주가 방식: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_prefix_roundtrip() {
        for ex in [Exchange::Shanghai, Exchange::Shenzhen] {
            assert_eq!(Exchange::from_prefix(ex.prefix()), Some(ex));
        }
        assert_eq!(Exchange::from_prefix("bj"), None);
        assert_eq!(Exchange::Shanghai.eastmoney_market_id(), 1);
        assert_eq!(Exchange::Shenzhen.eastmoney_market_id(), 0);
    }

    #[test]
    fn test_market_hint_lenient() {
        assert_eq!(MarketHint::parse_lenient("SH"), MarketHint::Sh);
        assert_eq!(MarketHint::parse_lenient("cyb"), MarketHint::Cyb);
        assert_eq!(MarketHint::parse_lenient("nasdaq"), MarketHint::Auto);
        assert_eq!(MarketHint::parse_lenient(""), MarketHint::Auto);
    }

    #[test]
    fn test_adjust_parse() {
        assert_eq!("".parse::<Adjust>().unwrap(), Adjust::None);
        assert_eq!("QFQ".parse::<Adjust>().unwrap(), Adjust::Qfq);
        assert_eq!("hfq".parse::<Adjust>().unwrap(), Adjust::Hfq);
        assert!("xfq".parse::<Adjust>().is_err());
        assert!(Adjust::Qfq.is_adjusted());
        assert!(!Adjust::None.is_adjusted());
    }

    #[test]
    fn test_adjust_serde() {
        let a: Adjust = serde_json::from_str("\"\"").unwrap();
        assert_eq!(a, Adjust::None);
        let a: Adjust = serde_json::from_str("\"qfq\"").unwrap();
        assert_eq!(a, Adjust::Qfq);
    }
}
