//! Formatting utilities for prices, percentages, and table cells.
//!
//! Every rendering surface (HTML page, SSE table, JSON API) uses these so the
//! same value always prints the same way.

use chrono::NaiveDateTime;
use stockcast_core::DISPLAY_DATETIME_FORMAT;

/// Formats a price with two decimal places.
///
/// # Examples
///
/// ```
/// use stockcast_api::utils::format_price;
///
/// assert_eq!(format_price(12.346), "12.35");
/// assert_eq!(format_price(8.0), "8.00");
/// ```
#[inline]
pub fn format_price(value: f64) -> String {
    format!("{:.2}", value)
}

/// Formats a percentage value (already scaled by 100) with two decimals.
///
/// The `%` sign is appended only when `with_sign` is true; the HTML page adds
/// its own.
///
/// # Examples
///
/// ```
/// use stockcast_api::utils::format_percent;
///
/// assert_eq!(format_percent(1.234, true), "1.23%");
/// assert_eq!(format_percent(-0.5, false), "-0.50");
/// ```
#[inline]
pub fn format_percent(value: f64, with_sign: bool) -> String {
    if with_sign {
        format!("{:.2}%", value)
    } else {
        format!("{:.2}", value)
    }
}

/// Formats an optional numeric table cell; missing values print as `NaN`.
#[inline]
pub fn format_cell(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{}", v),
        _ => "NaN".to_string(),
    }
}

/// Formats a bar timestamp as `YYYY-MM-DD HH:MM`.
#[inline]
pub fn format_bar_time(ts: &NaiveDateTime) -> String {
    ts.format(DISPLAY_DATETIME_FORMAT).to_string()
}
