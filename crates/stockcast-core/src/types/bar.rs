//! 분봉 및 시계열 구조체.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 테이블/JSON 출력에 쓰는 시각 형식.
pub const DISPLAY_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// OHLCV 분봉 하나.
///
/// 종가는 항상 유한한 값입니다. 다른 가격/거래량은 업스트림이 비정상 값을
/// 보낸 경우 `None`일 수 있습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// 봉 시각 (시장 현지 시각)
    pub timestamp: NaiveDateTime,
    /// 시가
    pub open: Option<f64>,
    /// 고가
    pub high: Option<f64>,
    /// 저가
    pub low: Option<f64>,
    /// 종가
    pub close: f64,
    /// 거래량
    pub volume: Option<f64>,
}

impl Bar {
    /// 종가만 있는 봉을 생성합니다.
    pub fn from_close(timestamp: NaiveDateTime, close: f64) -> Self {
        Self {
            timestamp,
            open: None,
            high: None,
            low: None,
            close,
            volume: None,
        }
    }
}

/// 시간 오름차순으로 정렬된 분봉 시계열.
///
/// 생성 시 타임스탬프 기준으로 정렬하며 동일 시각은 마지막 행만 남깁니다.
/// 종가가 유한하지 않은 행은 제외됩니다. 생성 후에는 변경할 수 없습니다.
/// 직렬화 형식은 분봉 배열이며, 역직렬화도 `new`를 거칩니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Bar>", into = "Vec<Bar>")]
pub struct StockSeries {
    bars: Vec<Bar>,
}

impl StockSeries {
    /// 분봉 목록으로 시계열을 생성합니다.
    pub fn new(mut bars: Vec<Bar>) -> Self {
        bars.retain(|b| b.close.is_finite());
        // 안정 정렬이므로 같은 시각의 행은 입력 순서를 유지합니다.
        bars.sort_by_key(|b| b.timestamp);

        let mut deduped: Vec<Bar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match deduped.last_mut() {
                Some(last) if last.timestamp == bar.timestamp => *last = bar,
                _ => deduped.push(bar),
            }
        }

        Self { bars: deduped }
    }

    /// 모든 봉.
    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    /// 종가 목록.
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// 봉 개수.
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// 마지막 종가.
    pub fn last_close(&self) -> Option<f64> {
        self.bars.last().map(|b| b.close)
    }

    /// 첫 봉 시각.
    pub fn first_timestamp(&self) -> Option<NaiveDateTime> {
        self.bars.first().map(|b| b.timestamp)
    }

    /// 마지막 봉 시각.
    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.bars.last().map(|b| b.timestamp)
    }

    /// 최근 `n`개 봉.
    pub fn tail(&self, n: usize) -> &[Bar] {
        let start = self.bars.len().saturating_sub(n);
        &self.bars[start..]
    }

    /// 조건을 만족하는 봉만 남긴 새 시계열을 반환합니다.
    pub fn filtered<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&Bar) -> bool,
    {
        Self {
            bars: self.bars.iter().filter(|b| keep(b)).cloned().collect(),
        }
    }

    /// 봉 목록을 소유권과 함께 반환합니다.
    pub fn into_bars(self) -> Vec<Bar> {
        self.bars
    }
}

impl From<Vec<Bar>> for StockSeries {
    fn from(bars: Vec<Bar>) -> Self {
        Self::new(bars)
    }
}

impl From<StockSeries> for Vec<Bar> {
    fn from(series: StockSeries) -> Self {
        series.bars
    }
}
