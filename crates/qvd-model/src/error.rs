use thiserror::Error;

/// Errors returned by [`QvdTable`](crate::QvdTable) operations.
///
/// Every mutating operation validates its inputs before touching the
/// table, so a returned error implies the table is unchanged.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("row length mismatch: expected {expected} values (one per column), got {actual}")]
    RowLengthMismatch { expected: usize, actual: usize },

    #[error("column length mismatch: expected {expected} values (one per row), got {actual}")]
    ColumnLengthMismatch { expected: usize, actual: usize },

    #[error("row index {index} out of bounds for {rows} rows")]
    RowIndexOutOfBounds { index: usize, rows: usize },

    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error("duplicate column name: {0}")]
    DuplicateColumn(String),

    #[error("column sets do not match: {0}")]
    ColumnMismatch(String),
}
