//! In-memory model for QVD (QlikView Data) tables.
//!
//! This crate provides:
//! - [`Value`], the closed set of cell variants a QVD file can store, with
//!   the equality/hash/ordering semantics the on-disk dictionary encoding
//!   relies on.
//! - [`NumberFormat`], the per-column format descriptor that drives the
//!   interpretation of dual values (dates, times, money, ...) at the
//!   file boundary.
//! - [`QvdTable`], a dictionary-coded table with row/column mutation,
//!   filter, sort, concat and join.
//!
//! File I/O lives in the `qvd-file` crate; this crate has none.

#![forbid(unsafe_code)]

mod error;
mod number_format;
mod table;
mod value;

pub use crate::error::TableError;
pub use crate::number_format::{FormatKind, NumberFormat};
pub use crate::table::{Column, JoinKind, QvdTable};
pub use crate::value::Value;
