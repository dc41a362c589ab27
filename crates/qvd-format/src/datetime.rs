//! Serial-date calendar math.
//!
//! QVD serials count days since 1899-12-30 (day 0); times are fractions
//! of a day. The conversions below use the classic era-based civil
//! calendar algorithms, valid across the whole proleptic Gregorian range
//! used in practice.

use std::time::{SystemTime, UNIX_EPOCH};

/// Days between 1899-12-30 and 1970-01-01.
const UNIX_EPOCH_SERIAL: i64 = 25_569;

const MICROS_PER_DAY: i64 = 86_400_000_000;

/// Calendar date broken out of a serial.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct CivilDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

/// Days since 1970-01-01 for a civil date.
fn days_from_civil(year: i32, month: u32, day: u32) -> i64 {
    let y = i64::from(year) - i64::from(month <= 2);
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let mp = (i64::from(month) + 9) % 12;
    let doy = (153 * mp + 2) / 5 + i64::from(day) - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

/// Civil date for days since 1970-01-01.
fn civil_from_days(z: i64) -> CivilDate {
    let z = z + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    CivilDate {
        year: (y + i64::from(month <= 2)) as i32,
        month,
        day,
    }
}

/// The QVD serial for a civil date (`1899-12-30` is day 0).
pub fn date_to_serial(year: i32, month: u32, day: u32) -> i64 {
    days_from_civil(year, month, day) + UNIX_EPOCH_SERIAL
}

/// The civil date `(year, month, day)` for a QVD serial.
pub fn serial_to_date(serial: i64) -> (i32, u32, u32) {
    let date = civil_from_days(serial - UNIX_EPOCH_SERIAL);
    (date.year, date.month, date.day)
}

/// Serial plus time-of-day, rounded to whole microseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct DateTimeParts {
    pub date: CivilDate,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub microsecond: u32,
}

/// Split a fractional serial into calendar and clock parts. Rounding to
/// microseconds may carry into the next day.
pub(crate) fn split_serial(serial: f64) -> DateTimeParts {
    let mut days = serial.floor() as i64;
    let fraction = serial - serial.floor();
    let mut micros = (fraction * MICROS_PER_DAY as f64).round() as i64;
    if micros >= MICROS_PER_DAY {
        days += 1;
        micros = 0;
    }

    let second_of_day = (micros / 1_000_000) as u32;
    DateTimeParts {
        date: civil_from_days(days - UNIX_EPOCH_SERIAL),
        hour: second_of_day / 3600,
        minute: second_of_day / 60 % 60,
        second: second_of_day % 60,
        microsecond: (micros % 1_000_000) as u32,
    }
}

/// Current UTC wall-clock time as `YYYY-MM-DDThh:mm:ss`, the shape QVD
/// headers use for `CreateUtcTime`.
pub fn utc_timestamp() -> String {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let serial =
        UNIX_EPOCH_SERIAL as f64 + elapsed.as_secs() as f64 / 86_400.0;
    let parts = split_serial(serial);
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
        parts.date.year, parts.date.month, parts.date.day, parts.hour, parts.minute, parts.second
    )
}
