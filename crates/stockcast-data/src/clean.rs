//! 원본 행 정제.
//!
//! 1. 시각 파싱 (실패한 행은 제외하고 개수를 기록)
//! 2. 숫자 열 변환 (열별 결측 증가를 기록)
//! 3. 종가 결측 행 제거
//! 4. 시각 오름차순 정렬, 동일 시각은 마지막 행 유지

use chrono::{NaiveDate, NaiveDateTime};

use stockcast_core::{Bar, StockSeries};

use crate::fetch_log::{FetchLog, FetchStep};
use crate::source::RawBar;

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

/// 업스트림 시각 문자열을 파싱합니다.
///
/// 날짜만 있으면 자정으로 취급합니다.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn parse_number(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// 원본 행을 정제된 시계열로 변환합니다.
pub fn clean_bars(raw: Vec<RawBar>, log: &mut FetchLog) -> StockSeries {
    log.push(FetchStep::RawRows { rows: raw.len() });

    let mut dropped = 0usize;
    let mut parsed: Vec<(NaiveDateTime, RawBar)> = Vec::with_capacity(raw.len());
    for row in raw {
        match row.day.as_deref().and_then(parse_timestamp) {
            Some(ts) => parsed.push((ts, row)),
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        log.push(FetchStep::DroppedTimestamps { count: dropped });
    }

    // 열별 결측 증가: 원래 비어 있던 값은 세지 않습니다.
    let columns: [(&'static str, fn(&RawBar) -> Option<&str>); 5] = [
        ("open", |r| r.open.as_deref()),
        ("high", |r| r.high.as_deref()),
        ("low", |r| r.low.as_deref()),
        ("close", |r| r.close.as_deref()),
        ("volume", |r| r.volume.as_deref()),
    ];
    for (column, get) in columns {
        let added = parsed
            .iter()
            .filter(|(_, r)| get(r).is_some() && parse_number(get(r)).is_none())
            .count();
        if added > 0 {
            log.push(FetchStep::NanIncrease { column, added });
        }
    }

    let bars: Vec<Bar> = parsed
        .into_iter()
        .filter_map(|(timestamp, r)| {
            let close = parse_number(r.close.as_deref())?;
            Some(Bar {
                timestamp,
                open: parse_number(r.open.as_deref()),
                high: parse_number(r.high.as_deref()),
                low: parse_number(r.low.as_deref()),
                close,
                volume: parse_number(r.volume.as_deref()),
            })
        })
        .collect();

    let with_close = bars.len();
    let series = StockSeries::new(bars);
    let duplicates = with_close - series.len();
    if duplicates > 0 {
        log.push(FetchStep::DuplicateTimestamps { count: duplicates });
    }

    log.push(FetchStep::Cleaned { rows: series.len() });
    series
}
