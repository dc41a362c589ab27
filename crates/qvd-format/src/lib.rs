//! Rendering of QVD number formats.
//!
//! QVD stores dates, times, timestamps, intervals and money as dual
//! values: a numeric component (a serial relative to the 1899-12-30
//! epoch, a day fraction, or a plain amount) plus a display string. This
//! crate turns the numeric component back into display text from the
//! format patterns carried in a QVD header (`DD.MM.YYYY`, `hh:mm:ss`,
//! `#,##0.00`, ...).

#![forbid(unsafe_code)]

mod datetime;
mod money;
mod pattern;

pub use crate::datetime::{date_to_serial, serial_to_date, utc_timestamp};
pub use crate::money::{MoneyFormat, SymbolPosition};
pub use crate::pattern::{format_date, format_interval, format_time, format_timestamp};
