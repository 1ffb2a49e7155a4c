//! Utility functions for date, number and text formatting.

pub mod format;

// Re-export commonly used functions at module level
pub use format::{
    camel_to_title_case, format_currency, format_date, format_date_str, format_number,
    to_title_case, truncate_text, DateStyle,
};
