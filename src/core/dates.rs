//! Date coercion and calendar helpers
//!
//! Cells arrive as native dates, spreadsheet serial numbers, or text in one
//! of several layouts. Everything resolves to a `NaiveDateTime` or to `None`.

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime};

use crate::types::CellValue;

const SECONDS_PER_DAY: i64 = 86_400;
const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Day zero of the 1900 date system once the phantom 29 Feb 1900 is skipped
fn serial_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .unwrap_or_default()
        .and_time(NaiveTime::MIN)
}

/// Convert a 1900-system serial to a date/time.
///
/// Serials below 60 are shifted by one day: the 1900 system counts a
/// 29 February 1900 that never existed, so serial 60 lands on 28 February.
pub fn from_serial(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 || serial > 2_958_465.0 {
        return None;
    }
    let mut days = serial.trunc() as i64;
    if serial > 0.0 && serial < 60.0 {
        days += 1;
    }
    let millis = (serial.fract() * MILLIS_PER_DAY).round() as i64;
    serial_epoch().checked_add_signed(Duration::days(days) + Duration::milliseconds(millis))
}

/// Inverse of [`from_serial`]
pub fn to_serial(dt: NaiveDateTime) -> f64 {
    let elapsed = dt - serial_epoch();
    let mut days = elapsed.num_days();
    if days < 61 && days > 0 {
        days -= 1;
    }
    let secs = elapsed.num_seconds() - elapsed.num_days() * SECONDS_PER_DAY;
    let millis = elapsed.num_milliseconds() - elapsed.num_seconds() * 1000;
    days as f64 + (secs as f64 * 1000.0 + millis as f64) / MILLIS_PER_DAY
}

/// Parse text against `formats`, first success wins.
///
/// Formats without a day-of-month field (e.g. `%b-%y`) resolve to day 1.
pub fn parse_text(s: &str, formats: &[String]) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    formats.iter().find_map(|fmt| parse_with(s, fmt))
}

fn parse_with(s: &str, fmt: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
        return Some(dt);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
        return Some(d.and_time(NaiveTime::MIN));
    }
    if !fmt.contains("%d") && !fmt.contains("%e") {
        let padded = format!("{} 1", s);
        let padded_fmt = format!("{} %d", fmt);
        if let Ok(d) = NaiveDate::parse_from_str(&padded, &padded_fmt) {
            return Some(d.and_time(NaiveTime::MIN));
        }
    }
    None
}

/// Resolve a cell to a date: native passthrough, then serial, then text.
pub fn coerce_date(value: &CellValue, formats: &[String]) -> Option<NaiveDateTime> {
    match value {
        CellValue::Date(dt) => Some(*dt),
        CellValue::Number(n) => from_serial(*n),
        CellValue::Text(s) => parse_text(s, formats),
        CellValue::Empty | CellValue::Bool(_) => None,
    }
}

/// Whole days from `start` to `end` (or `now` while still open), floored
pub fn elapsed_days(start: NaiveDateTime, end: Option<NaiveDateTime>, now: NaiveDateTime) -> i64 {
    let end = end.unwrap_or(now);
    (end - start).num_seconds().div_euclid(SECONDS_PER_DAY)
}

/// Add calendar months, clamping the day to the target month's length
pub fn add_months(dt: NaiveDateTime, months: u32) -> NaiveDateTime {
    dt.checked_add_months(Months::new(months)).unwrap_or(dt)
}

/// Midnight on the first day of the month after `dt`
pub fn first_of_next_month(dt: NaiveDateTime) -> NaiveDateTime {
    let (year, month) = if dt.month() == 12 {
        (dt.year() + 1, 1)
    } else {
        (dt.year(), dt.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|d| d.and_time(NaiveTime::MIN))
        .unwrap_or(dt)
}

/// `Oct-25`
pub fn month_label(dt: NaiveDateTime) -> String {
    dt.format("%b-%y").to_string()
}

/// `1-Oct-25`
pub fn day_label(dt: NaiveDateTime) -> String {
    dt.format("%-d-%b-%y").to_string()
}
