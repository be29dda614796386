//! 분봉 HTML 테이블.

use std::fmt::Write;

use stockcast_core::{Bar, StockSeries};

use super::escape_html;
use crate::utils::{format_bar_time, format_cell};

/// 페이지/스트림에 표시하는 최대 행 수.
pub const TABLE_ROW_LIMIT: usize = 200;

const COLUMNS: [&str; 6] = ["datetime", "open", "high", "low", "close", "volume"];

/// 렌더링된 테이블.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableView {
    pub html: String,
    /// 표시한 행 수
    pub rows: usize,
}

/// 시계열의 마지막 `TABLE_ROW_LIMIT`행을 테이블로 렌더링합니다.
pub fn render_series_table(series: &StockSeries) -> TableView {
    let bars = series.tail(TABLE_ROW_LIMIT);
    TableView {
        html: render_table(bars),
        rows: bars.len(),
    }
}

/// 분봉 목록을 `<table>`로 렌더링합니다.
pub fn render_table(bars: &[Bar]) -> String {
    let mut html = String::with_capacity(128 + bars.len() * 160);
    html.push_str("<table class=\"dataframe\">\n<thead>\n<tr style=\"text-align: right;\">");
    for column in COLUMNS {
        let _ = write!(html, "<th>{}</th>", column);
    }
    html.push_str("</tr>\n</thead>\n<tbody>\n");

    for bar in bars {
        let _ = write!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            escape_html(&format_bar_time(&bar.timestamp)),
            format_cell(bar.open),
            format_cell(bar.high),
            format_cell(bar.low),
            format_cell(Some(bar.close)),
            format_cell(bar.volume),
        );
    }

    html.push_str("</tbody>\n</table>");
    html
}
