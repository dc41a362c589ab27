//! Reading and writing QVD (QlikView Data) files.
//!
//! A QVD file is one table in three sections: an XML header terminated by
//! `\r\n\0`, a column-major symbol table of the distinct values per field,
//! and a row-major index table of bit-packed codes into the symbol lists.
//! Everything on disk is little-endian.
//!
//! - [`read_qvd`] consumes any [`std::io::Read`] source sequentially and
//!   returns a [`qvd_model::QvdTable`].
//! - [`read_qvd_chunks`] needs `Read + Seek` and yields the table in
//!   row chunks, streaming only the index table.
//! - [`write_qvd`] persists a table; [`WriteOptions`] controls the table
//!   name and the display patterns regenerated for formatted columns.

#![forbid(unsafe_code)]

mod error;
mod header;
mod index;
mod read;
mod symbols;
mod write;

pub use crate::error::QvdError;
pub use crate::header::{FieldHeader, LineageInfo, TableHeader};
pub use crate::read::{read_qvd, read_qvd_chunks, ChunkedReader};
pub use crate::write::{write_qvd, WriteOptions};
