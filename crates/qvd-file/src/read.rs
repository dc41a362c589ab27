//! Reading QVD files.
//!
//! [`read_qvd`] consumes the three sections sequentially and needs only
//! [`Read`]. [`read_qvd_chunks`] keeps the header and symbol table in
//! memory and streams the index table with one seek per chunk.

use std::io::{Read, Seek, SeekFrom};

use qvd_model::{Column, QvdTable, Value};

use crate::header::{find_terminator, parse_header, TableHeader, HEADER_TERMINATOR};
use crate::index::{decode_code, validate_layout};
use crate::symbols::decode_column;
use crate::QvdError;

const SCAN_BLOCK: usize = 512;

/// Read a whole QVD file into a table.
pub fn read_qvd<R: Read>(mut reader: R) -> Result<QvdTable, QvdError> {
    let (header_block, overrun) = scan_header(&mut reader)?;
    let header = parse_header(&header_block)?;
    let mut body = std::io::Cursor::new(overrun).chain(reader);

    let mut symbol_buffer = vec![0u8; header.offset];
    body.read_exact(&mut symbol_buffer)?;
    let symbols = decode_symbol_table(&symbol_buffer, &header)?;

    validate_index(&header)?;
    let mut index_buffer = vec![0u8; header.length];
    body.read_exact(&mut index_buffer)?;

    build_table(&header, &symbols, &index_buffer, header.no_of_records, 0)
}

/// Open a QVD file for chunked reading: the header and symbol table are
/// loaded eagerly, index records are read `chunk_size` rows at a time.
pub fn read_qvd_chunks<R: Read + Seek>(
    reader: R,
    chunk_size: usize,
) -> Result<ChunkedReader<R>, QvdError> {
    ChunkedReader::new(reader, chunk_size)
}

/// Scan forward for `\r\n\0`, returning the header block (terminator
/// included) and whatever was read past it.
fn scan_header<R: Read>(reader: &mut R) -> Result<(Vec<u8>, Vec<u8>), QvdError> {
    let mut buffer = Vec::new();
    let mut block = [0u8; SCAN_BLOCK];
    loop {
        let scanned = buffer.len();
        let n = match reader.read(&mut block) {
            Ok(0) => return Err(QvdError::UnterminatedHeader { scanned }),
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        buffer.extend_from_slice(&block[..n]);

        let from = scanned.saturating_sub(HEADER_TERMINATOR.len() - 1);
        if let Some(position) = find_terminator(&buffer, from) {
            let overrun = buffer.split_off(position + HEADER_TERMINATOR.len());
            return Ok((buffer, overrun));
        }
    }
}

fn decode_symbol_table(
    buffer: &[u8],
    header: &TableHeader,
) -> Result<Vec<Vec<Value>>, QvdError> {
    header
        .fields
        .iter()
        .map(|field| decode_column(buffer, field))
        .collect()
}

fn validate_index(header: &TableHeader) -> Result<(), QvdError> {
    validate_layout(header)?;
    let expected = header.no_of_records * header.record_byte_size;
    if header.length != expected {
        return Err(QvdError::IndexLengthMismatch {
            declared: header.length,
            records: header.no_of_records,
            record_size: header.record_byte_size,
        });
    }
    Ok(())
}

/// Decode `rows` records from `index_buffer` into a table that shares
/// nothing with the caller. `base_record` is the absolute index of the
/// first record, for error context.
fn build_table(
    header: &TableHeader,
    symbols: &[Vec<Value>],
    index_buffer: &[u8],
    rows: usize,
    base_record: usize,
) -> Result<QvdTable, QvdError> {
    let record_size = header.record_byte_size;
    let mut codes: Vec<Vec<Option<u32>>> = header
        .fields
        .iter()
        .map(|_| Vec::with_capacity(rows))
        .collect();

    for row in 0..rows {
        let record = &index_buffer[row * record_size..(row + 1) * record_size];
        for (field_index, field) in header.fields.iter().enumerate() {
            codes[field_index].push(decode_code(
                record,
                field,
                symbols[field_index].len(),
                base_record + row,
            )?);
        }
    }

    let columns = header
        .fields
        .iter()
        .zip(symbols)
        .zip(codes)
        .map(|((field, symbols), codes)| {
            Column::from_parts(
                field.field_name.clone(),
                symbols.clone(),
                codes,
                field.number_format.clone(),
                field.tags.clone(),
            )
        })
        .collect();
    Ok(QvdTable::from_parts(columns)?)
}

/// Lazy sequence of row chunks of one QVD file, all sharing the schema.
///
/// Yields `ceil(NoOfRecords / chunk_size)` tables of up to `chunk_size`
/// rows each; the count is available up front from
/// [`ChunkedReader::chunk_count`] and the iterator's `len()`.
pub struct ChunkedReader<R> {
    reader: R,
    header: TableHeader,
    symbols: Vec<Vec<Value>>,
    index_start: u64,
    chunk_size: usize,
    next_chunk: usize,
    chunk_count: usize,
}

impl<R: Read + Seek> ChunkedReader<R> {
    fn new(mut reader: R, chunk_size: usize) -> Result<Self, QvdError> {
        if chunk_size == 0 {
            return Err(QvdError::InvalidChunkSize);
        }

        reader.seek(SeekFrom::Start(0))?;
        let (header_block, _) = scan_header(&mut reader)?;
        let header = parse_header(&header_block)?;

        let symbol_start = header_block.len() as u64;
        reader.seek(SeekFrom::Start(symbol_start))?;
        let mut symbol_buffer = vec![0u8; header.offset];
        reader.read_exact(&mut symbol_buffer)?;
        let symbols = decode_symbol_table(&symbol_buffer, &header)?;

        validate_index(&header)?;
        let chunk_count = header.no_of_records.div_ceil(chunk_size);

        Ok(ChunkedReader {
            reader,
            index_start: symbol_start + header.offset as u64,
            header,
            symbols,
            chunk_size,
            next_chunk: 0,
            chunk_count,
        })
    }

    /// Total number of chunks, `ceil(NoOfRecords / chunk_size)`.
    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    /// The parsed file header (lineage, comments, build metadata).
    pub fn header(&self) -> &TableHeader {
        &self.header
    }

    fn read_chunk(&mut self, chunk: usize) -> Result<QvdTable, QvdError> {
        let first_row = chunk * self.chunk_size;
        let rows = self.chunk_size.min(self.header.no_of_records - first_row);
        let record_size = self.header.record_byte_size;

        let byte_offset = self.index_start + (first_row * record_size) as u64;
        self.reader.seek(SeekFrom::Start(byte_offset))?;
        let mut buffer = vec![0u8; rows * record_size];
        self.reader.read_exact(&mut buffer)?;

        build_table(&self.header, &self.symbols, &buffer, rows, first_row)
    }
}

impl<R: Read + Seek> Iterator for ChunkedReader<R> {
    type Item = Result<QvdTable, QvdError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_chunk >= self.chunk_count {
            return None;
        }
        let chunk = self.next_chunk;
        self.next_chunk += 1;
        Some(self.read_chunk(chunk))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.chunk_count - self.next_chunk;
        (remaining, Some(remaining))
    }
}

impl<R: Read + Seek> ExactSizeIterator for ChunkedReader<R> {}
