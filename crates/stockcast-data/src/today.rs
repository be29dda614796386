//! 당일 필터.

use chrono::{NaiveDateTime, Utc};
use chrono_tz::Asia::Shanghai;

use stockcast_core::StockSeries;

/// A주 시장 현지 시각 (Asia/Shanghai).
pub fn market_now() -> NaiveDateTime {
    Utc::now().with_timezone(&Shanghai).naive_local()
}

/// `now`와 같은 날짜이고 `now` 이전인 봉만 남깁니다.
pub fn filter_today(series: &StockSeries, now: NaiveDateTime) -> StockSeries {
    let today = now.date();
    series.filtered(|bar| bar.timestamp.date() == today && bar.timestamp <= now)
}
