//! Display-string helpers. Pure functions, no state.

use chrono::{Local, TimeZone};

/// Placeholder shown when a real value is unavailable. Distinct from zero.
pub const SENTINEL: &str = "--";

/// US-style currency: two decimals, thousands separators. `None` and
/// non-finite values render the sentinel.
pub fn format_currency(value: Option<f64>) -> String {
    let Some(v) = value else {
        return SENTINEL.to_string();
    };
    if !v.is_finite() {
        return SENTINEL.to_string();
    }

    let fixed = format!("{:.2}", v.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let grouped = group_thousands(int_part);

    if v < 0.0 {
        format!("-${grouped}.{frac_part}")
    } else {
        format!("${grouped}.{frac_part}")
    }
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Localized time-of-day for an epoch-milliseconds stamp.
pub fn format_time_local(ts_ms: i64) -> String {
    match Local.timestamp_millis_opt(ts_ms).single() {
        Some(dt) => dt.format("%H:%M:%S").to_string(),
        None => SENTINEL.to_string(),
    }
}

/// Wall-clock time for the header.
pub fn clock_now() -> String {
    Local::now().format("%H:%M:%S").to_string()
}
