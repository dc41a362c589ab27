//! Token-based rendering of QVD date/time/interval patterns.
//!
//! Patterns are literal text with embedded tokens (`YYYY`, `MM`, `DD`,
//! `hh`, `mm`, `ss`, `fff`, ...). Tokens are matched longest-first at
//! each position; everything else passes through verbatim.

use std::fmt::Write;

use crate::datetime::{split_serial, DateTimeParts};

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Render a date serial (days since 1899-12-30) with a date pattern.
pub fn format_date(serial: i64, pattern: &str) -> String {
    render_datetime(split_serial(serial as f64), pattern)
}

/// Render a day fraction (`0.5` = noon) with a time pattern.
pub fn format_time(day_fraction: f64, pattern: &str) -> String {
    render_datetime(split_serial(day_fraction), pattern)
}

/// Render a fractional serial with a combined date+time pattern.
pub fn format_timestamp(serial: f64, pattern: &str) -> String {
    render_datetime(split_serial(serial), pattern)
}

fn render_datetime(parts: DateTimeParts, pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let bytes = pattern.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let rest = &pattern[i..];
        let (text, consumed) = match_datetime_token(rest, &parts);
        match text {
            Some(text) => {
                out.push_str(&text);
                i += consumed;
            }
            None => {
                let ch = rest.chars().next().unwrap_or('\0');
                out.push(ch);
                i += ch.len_utf8();
            }
        }
    }
    out
}

fn match_datetime_token(rest: &str, parts: &DateTimeParts) -> (Option<String>, usize) {
    for (token, render) in DATETIME_TOKENS {
        if rest.starts_with(token) {
            return (Some(render(parts)), token.len());
        }
    }
    if let Some(run) = fraction_run(rest) {
        return (Some(render_fraction(parts.microsecond, run)), run);
    }
    (None, 0)
}

type TokenRenderer = fn(&DateTimeParts) -> String;

// Longest token first so `YYYY` wins over `YY`, `MMMM` over `MM`, etc.
const DATETIME_TOKENS: &[(&str, TokenRenderer)] = &[
    ("YYYY", |p| format!("{:04}", p.date.year)),
    ("YY", |p| format!("{:02}", p.date.year.rem_euclid(100))),
    ("MMMM", |p| month_name(p.date.month).to_string()),
    ("MMM", |p| month_name(p.date.month)[..3].to_string()),
    ("MM", |p| format!("{:02}", p.date.month)),
    ("M", |p| p.date.month.to_string()),
    ("DD", |p| format!("{:02}", p.date.day)),
    ("D", |p| p.date.day.to_string()),
    ("hh", |p| format!("{:02}", p.hour)),
    ("HH", |p| format!("{:02}", twelve_hour(p.hour))),
    ("mm", |p| format!("{:02}", p.minute)),
    ("ss", |p| format!("{:02}", p.second)),
    ("tt", |p| if p.hour < 12 { "AM" } else { "PM" }.to_string()),
];

fn month_name(month: u32) -> &'static str {
    MONTH_NAMES
        .get(month.saturating_sub(1) as usize)
        .unwrap_or(&"")
}

fn twelve_hour(hour: u32) -> u32 {
    match hour % 12 {
        0 => 12,
        h => h,
    }
}

/// Length of a leading `f` run (1..=6), if any.
fn fraction_run(rest: &str) -> Option<usize> {
    let run = rest.bytes().take_while(|&b| b == b'f').count().min(6);
    (run > 0).then_some(run)
}

/// The first `digits` digits of the six-digit microsecond field.
fn render_fraction(microsecond: u32, digits: usize) -> String {
    let full = format!("{microsecond:06}");
    full[..digits].to_string()
}

/// Render an interval (a signed number of days) with an interval pattern.
///
/// Tokens are `D`, `hh`, `mm`, `ss` and `f` runs. Units missing from the
/// pattern fold into the next smaller one: `hh:mm:ss` renders 2.5 days as
/// `60:00:00`, `mm:ss` as `3600:00`.
pub fn format_interval(days: f64, pattern: &str) -> String {
    let negative = days < 0.0;
    let total_micros = (days.abs() * 86_400_000_000.0).round() as u64;

    let mut day_part = total_micros / 86_400_000_000;
    let mut hours = total_micros / 3_600_000_000 % 24;
    let mut minutes = total_micros / 60_000_000 % 60;
    let mut seconds = total_micros / 1_000_000 % 60;
    let millis = total_micros / 1_000 % 1_000;

    let has_days = pattern.contains('D');
    let has_hours = pattern.contains("hh");
    let has_minutes = pattern.contains("mm");
    if !has_days {
        hours += day_part * 24;
        day_part = 0;
    }
    if !has_hours {
        minutes += hours * 60;
        hours = 0;
    }
    if !has_minutes {
        seconds += minutes * 60;
        minutes = 0;
    }

    let mut out = String::with_capacity(pattern.len() + 4);
    if negative {
        out.push('-');
    }
    let bytes = pattern.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let rest = &pattern[i..];
        if rest.starts_with("hh") {
            let _ = write!(out, "{hours:02}");
            i += 2;
        } else if rest.starts_with("mm") {
            let _ = write!(out, "{minutes:02}");
            i += 2;
        } else if rest.starts_with("ss") {
            let _ = write!(out, "{seconds:02}");
            i += 2;
        } else if let Some(run) = fraction_run(rest) {
            let _ = write!(out, "{:0width$}", millis, width = run);
            i += run;
        } else if rest.starts_with('D') {
            let _ = write!(out, "{day_part}");
            i += 1;
        } else {
            let ch = rest.chars().next().unwrap_or('\0');
            out.push(ch);
            i += ch.len_utf8();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date_to_serial;

    #[test]
    fn date_patterns() {
        let serial = date_to_serial(2024, 3, 7);
        assert_eq!(format_date(serial, "YYYY-MM-DD"), "2024-03-07");
        assert_eq!(format_date(serial, "DD.MM.YYYY"), "07.03.2024");
        assert_eq!(format_date(serial, "D/M/YY"), "7/3/24");
        assert_eq!(format_date(serial, "MMM DD, YYYY"), "Mar 07, 2024");
        assert_eq!(format_date(serial, "MMMM"), "March");
    }

    #[test]
    fn time_patterns() {
        let fraction = (13.0 * 3600.0 + 5.0 * 60.0 + 9.0) / 86_400.0;
        assert_eq!(format_time(fraction, "hh:mm:ss"), "13:05:09");
        assert_eq!(format_time(fraction, "HH:mm tt"), "01:05 PM");
        assert_eq!(format_time(0.0, "HH:mm tt"), "12:00 AM");
    }

    #[test]
    fn timestamp_patterns_with_fractions() {
        let serial = date_to_serial(2024, 3, 7) as f64 + 0.5 + 0.125 / 86_400.0;
        assert_eq!(
            format_timestamp(serial, "YYYY-MM-DD hh:mm:ss.fff"),
            "2024-03-07 12:00:00.125"
        );
    }

    #[test]
    fn interval_folds_missing_units() {
        let interval = 2.0 + (3.0 * 3600.0 + 4.0 * 60.0 + 5.0) / 86_400.0;
        assert_eq!(format_interval(interval, "D hh:mm:ss"), "2 03:04:05");
        assert_eq!(format_interval(interval, "hh:mm:ss"), "51:04:05");
        assert_eq!(format_interval(0.5, "mm:ss"), "720:00");
        assert_eq!(format_interval(-0.5, "hh:mm"), "-12:00");
    }
}
