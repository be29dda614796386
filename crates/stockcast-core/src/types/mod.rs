//! 도메인 타입.

pub mod bar;
pub mod market;
pub mod period;

pub use bar::{Bar, StockSeries, DISPLAY_DATETIME_FORMAT};
pub use market::{Adjust, Exchange, MarketHint};
pub use period::{BarPeriod, DataAmount};
