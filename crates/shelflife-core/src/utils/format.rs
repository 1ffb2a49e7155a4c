use std::fmt::Display;

use chrono::{DateTime, NaiveDate, TimeZone};

/// Default maximum length for `truncate_text`
pub const DEFAULT_TRUNCATE_LENGTH: usize = 100;

/// Default currency for `format_currency`
pub const DEFAULT_CURRENCY: &str = "USD";

/// Date layouts, all US English
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateStyle {
    /// "Jan 5, 2024"
    #[default]
    Short,
    /// "January 5, 2024"
    Long,
    /// "1/5/2024"
    Numeric,
}

impl DateStyle {
    fn pattern(self) -> &'static str {
        match self {
            DateStyle::Short => "%b %-d, %Y",
            DateStyle::Long => "%B %-d, %Y",
            DateStyle::Numeric => "%-m/%-d/%Y",
        }
    }
}

/// Format a date in its own time zone
pub fn format_date<Tz>(date: &DateTime<Tz>, style: DateStyle) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    date.format(style.pattern()).to_string()
}

/// Format a date string to a more readable format.
/// Accepts RFC 3339, `YYYY-MM-DD` or epoch milliseconds; anything else is
/// returned unchanged.
pub fn format_date_str(date: &str, style: DateStyle) -> String {
    let date = date.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(date) {
        format_date(&dt, style)
    } else if let Ok(day) = NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        day.format(style.pattern()).to_string()
    } else if let Some(dt) = date
        .parse::<i64>()
        .ok()
        .and_then(DateTime::from_timestamp_millis)
    {
        format_date(&dt, style)
    } else {
        date.to_string()
    }
}

/// Format a number with thousands separators and exactly `decimals`
/// fraction digits.
///
/// Rounds the shortest decimal form of `num` (what it prints as), halves
/// away from zero, so `1.005` gives "1.01". Negative values keep their sign
/// even when they round to zero.
pub fn format_number(num: f64, decimals: usize) -> String {
    if num.is_nan() {
        return "NaN".to_string();
    }
    if num.is_infinite() {
        return if num < 0.0 { "-∞" } else { "∞" }.to_string();
    }

    let (int_part, frac_part) = round_decimal(num.abs(), decimals);

    let mut out = String::with_capacity(int_part.len() + int_part.len() / 3 + decimals + 2);
    if num.is_sign_negative() {
        out.push('-');
    }
    out.push_str(&group_thousands(&int_part));
    if decimals > 0 {
        out.push('.');
        out.push_str(&frac_part);
    }
    out
}

/// Split a non-negative finite number into integer digits and exactly
/// `decimals` fraction digits
fn round_decimal(magnitude: f64, decimals: usize) -> (String, String) {
    // Display never uses exponent notation for f64
    let repr = magnitude.to_string();
    let (int_part, frac_part) = repr.split_once('.').unwrap_or((repr.as_str(), ""));

    let mut digits: Vec<u8> = int_part
        .bytes()
        .chain(frac_part.bytes().chain(std::iter::repeat(b'0')).take(decimals))
        .collect();

    if frac_part.as_bytes().get(decimals).is_some_and(|d| *d >= b'5') {
        let mut i = digits.len();
        loop {
            if i == 0 {
                digits.insert(0, b'1');
                break;
            }
            i -= 1;
            if digits[i] == b'9' {
                digits[i] = b'0';
            } else {
                digits[i] += 1;
                break;
            }
        }
    }

    let split = digits.len() - decimals;
    let int_digits = digits[..split].iter().map(|&d| d as char).collect();
    let frac_digits = digits[split..].iter().map(|&d| d as char).collect();
    (int_digits, frac_digits)
}

/// Format an amount as currency, e.g. "$1,234.50" or "¥1,235".
/// Currencies without a known symbol are prefixed with their code.
pub fn format_currency(amount: f64, currency: &str) -> String {
    let code = currency.trim().to_ascii_uppercase();
    let (prefix, decimals) = match code.as_str() {
        "USD" => ("$".to_string(), 2),
        "EUR" => ("€".to_string(), 2),
        "GBP" => ("£".to_string(), 2),
        "JPY" => ("¥".to_string(), 0),
        "KRW" => ("₩".to_string(), 0),
        "INR" => ("₹".to_string(), 2),
        "CNY" => ("CN¥".to_string(), 2),
        "CAD" => ("CA$".to_string(), 2),
        "AUD" => ("A$".to_string(), 2),
        "MXN" => ("MX$".to_string(), 2),
        _ => (format!("{}\u{a0}", code), 2),
    };

    let number = format_number(amount, decimals);
    match number.strip_prefix('-') {
        Some(unsigned) => format!("-{}{}", prefix, unsigned),
        None => format!("{}{}", prefix, number),
    }
}

/// Truncate text to `max_chars` characters, adding an ellipsis if needed.
/// The kept part is trimmed before the ellipsis is appended.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let head: String = text.chars().take(max_chars).collect();
    format!("{}...", head.trim())
}

/// "hello WORLD" -> "Hello World"
pub fn to_title_case(s: &str) -> String {
    s.to_lowercase()
        .split(' ')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

/// "firstName" -> "First Name"
pub fn camel_to_title_case(s: &str) -> String {
    let mut spaced = String::with_capacity(s.len() + s.len() / 4);
    for c in s.chars() {
        if c.is_ascii_uppercase() {
            spaced.push(' ');
        }
        spaced.push(c);
    }
    capitalize(&spaced)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}
