//! 분봉 주기와 조회 데이터량 정의.
//!
//! A주는 하루 4시간(240분) 거래되므로 주기별 하루 봉 개수가 고정됩니다.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// 분봉 주기.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BarPeriod {
    /// 1분봉
    M1,
    /// 5분봉
    M5,
    /// 15분봉
    M15,
    /// 30분봉
    M30,
    /// 60분봉
    #[default]
    M60,
}

impl BarPeriod {
    /// 지원하는 모든 주기 (화면 표시 순서).
    pub const ALL: [BarPeriod; 5] = [
        BarPeriod::M60,
        BarPeriod::M30,
        BarPeriod::M15,
        BarPeriod::M5,
        BarPeriod::M1,
    ];

    /// 분 단위 값을 반환합니다.
    pub fn minutes(&self) -> u32 {
        match self {
            BarPeriod::M1 => 1,
            BarPeriod::M5 => 5,
            BarPeriod::M15 => 15,
            BarPeriod::M30 => 30,
            BarPeriod::M60 => 60,
        }
    }

    /// 분 단위 값에서 주기를 찾습니다.
    pub fn from_minutes(minutes: u32) -> Option<Self> {
        match minutes {
            1 => Some(BarPeriod::M1),
            5 => Some(BarPeriod::M5),
            15 => Some(BarPeriod::M15),
            30 => Some(BarPeriod::M30),
            60 => Some(BarPeriod::M60),
            _ => None,
        }
    }

    /// 거래일 하루당 봉 개수.
    pub fn steps_per_day(&self) -> usize {
        match self {
            BarPeriod::M1 => 240,
            BarPeriod::M5 => 48,
            BarPeriod::M15 => 16,
            BarPeriod::M30 => 8,
            BarPeriod::M60 => 4,
        }
    }

    /// 업스트림 API의 `scale`/`period` 파라미터 값.
    pub fn as_param(&self) -> String {
        self.minutes().to_string()
    }
}

impl fmt::Display for BarPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.minutes())
    }
}

impl FromStr for BarPeriod {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().to_lowercase();
        let digits = trimmed
            .trim_end_matches("min")
            .trim_end_matches('m')
            .trim();
        digits
            .parse::<u32>()
            .ok()
            .and_then(BarPeriod::from_minutes)
            .ok_or_else(|| CoreError::InvalidInput(format!("지원하지 않는 주기: {}", s)))
    }
}

impl Serialize for BarPeriod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_param())
    }
}

impl<'de> Deserialize<'de> for BarPeriod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // 프론트엔드는 "60"과 60을 모두 보냅니다.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Num(u32),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Num(n) => BarPeriod::from_minutes(n)
                .ok_or_else(|| de::Error::custom(format!("지원하지 않는 주기: {}", n))),
            Repr::Text(s) => s.parse().map_err(de::Error::custom),
        }
    }
}

/// 조회 데이터량 설정.
///
/// `/api/fetch`가 반환할 최근 행 수를 결정합니다.
///
/// 알 수 없는 값은 역직렬화 시 `Auto`로 처리합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataAmount {
    /// 30일 × 24 (720행)
    Short,
    /// 90일 × 24 (2160행)
    Medium,
    /// 180일 × 24 (4320행)
    Long,
    /// 365일 × 24 (8760행)
    Max,
    /// 180 거래일 분량, 최소 1000행
    #[default]
    Auto,
}

impl DataAmount {
    /// 사용 가능한 행 수(`available`) 안에서 반환할 행 수를 계산합니다.
    pub fn row_limit(&self, period: BarPeriod, available: usize) -> usize {
        let wanted = match self {
            DataAmount::Short => 720,
            DataAmount::Medium => 2160,
            DataAmount::Long => 4320,
            DataAmount::Max => 8760,
            DataAmount::Auto => (180 * period.steps_per_day()).max(1000),
        };
        wanted.min(available)
    }
}

impl FromStr for DataAmount {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "short" => Ok(DataAmount::Short),
            "medium" => Ok(DataAmount::Medium),
            "long" => Ok(DataAmount::Long),
            "max" => Ok(DataAmount::Max),
            "" | "auto" => Ok(DataAmount::Auto),
            other => Err(CoreError::InvalidInput(format!("알 수 없는 데이터량: {}", other))),
        }
    }
}

impl<'de> Deserialize<'de> for DataAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.and_then(|s| s.parse().ok()).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steps_per_day() {
        assert_eq!(BarPeriod::M1.steps_per_day(), 240);
        assert_eq!(BarPeriod::M5.steps_per_day(), 48);
        assert_eq!(BarPeriod::M15.steps_per_day(), 16);
        assert_eq!(BarPeriod::M30.steps_per_day(), 8);
        assert_eq!(BarPeriod::M60.steps_per_day(), 4);
    }

    #[test]
    fn test_period_from_str() {
        assert_eq!("60".parse::<BarPeriod>().unwrap(), BarPeriod::M60);
        assert_eq!(" 5 ".parse::<BarPeriod>().unwrap(), BarPeriod::M5);
        assert_eq!("15m".parse::<BarPeriod>().unwrap(), BarPeriod::M15);
        assert_eq!("30min".parse::<BarPeriod>().unwrap(), BarPeriod::M30);
        assert!("7".parse::<BarPeriod>().is_err());
        assert!("abc".parse::<BarPeriod>().is_err());
    }

    #[test]
    fn test_period_serde_accepts_number_and_string() {
        let p: BarPeriod = serde_json::from_str("60").unwrap();
        assert_eq!(p, BarPeriod::M60);
        let p: BarPeriod = serde_json::from_str("\"1\"").unwrap();
        assert_eq!(p, BarPeriod::M1);
        assert!(serde_json::from_str::<BarPeriod>("2").is_err());

        assert_eq!(serde_json::to_string(&BarPeriod::M15).unwrap(), "\"15\"");
    }

    #[test]
    fn test_data_amount_row_limit() {
        assert_eq!(DataAmount::Short.row_limit(BarPeriod::M60, 10_000), 720);
        assert_eq!(DataAmount::Medium.row_limit(BarPeriod::M60, 10_000), 2160);
        assert_eq!(DataAmount::Long.row_limit(BarPeriod::M60, 10_000), 4320);
        assert_eq!(DataAmount::Max.row_limit(BarPeriod::M60, 10_000), 8760);
        assert_eq!(DataAmount::Max.row_limit(BarPeriod::M60, 500), 500);

        // 60분봉: 180 * 4 = 720 < 1000 → 최소 1000
        assert_eq!(DataAmount::Auto.row_limit(BarPeriod::M60, 5000), 1000);
        // 1분봉: 180 * 240 = 43200
        assert_eq!(DataAmount::Auto.row_limit(BarPeriod::M1, 50_000), 43_200);
        assert_eq!(DataAmount::Auto.row_limit(BarPeriod::M1, 1970), 1970);
    }

    #[test]
    fn test_data_amount_from_str() {
        assert_eq!("SHORT".parse::<DataAmount>().unwrap(), DataAmount::Short);
        assert_eq!("".parse::<DataAmount>().unwrap(), DataAmount::Auto);
        assert!("huge".parse::<DataAmount>().is_err());
    }

    #[test]
    fn test_data_amount_serde_unknown_is_auto() {
        let a: DataAmount = serde_json::from_str("\"long\"").unwrap();
        assert_eq!(a, DataAmount::Long);
        let a: DataAmount = serde_json::from_str("\"\"").unwrap();
        assert_eq!(a, DataAmount::Auto);
        let a: DataAmount = serde_json::from_str("\"week\"").unwrap();
        assert_eq!(a, DataAmount::Auto);
        let a: DataAmount = serde_json::from_str("null").unwrap();
        assert_eq!(a, DataAmount::Auto);

        assert_eq!(serde_json::to_string(&DataAmount::Medium).unwrap(), "\"medium\"");
    }
}
