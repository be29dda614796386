//! Shared helpers for the API handlers.

pub mod format;

pub use format::{format_bar_time, format_cell, format_percent, format_price};
