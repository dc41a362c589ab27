use qvd_model::TableError;
use thiserror::Error;

/// Errors raised while reading or writing a QVD file.
///
/// Parse errors are fatal to the call; the byte offsets and field names
/// they carry refer to the on-disk layout (symbol offsets are relative to
/// the symbol-table start).
#[derive(Debug, Error)]
pub enum QvdError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no `\\r\\n\\0` header terminator in the first {scanned} bytes")]
    UnterminatedHeader { scanned: usize },

    #[error("header is not valid UTF-8")]
    HeaderUtf8,

    #[error("header XML is malformed: {0}")]
    HeaderXml(#[from] roxmltree::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("header element `{0}` is missing")]
    MissingHeaderElement(&'static str),

    #[error("header element `{element}` has invalid value `{value}`")]
    InvalidHeaderElement { element: &'static str, value: String },

    #[error(
        "field `{field}`: symbol section at offset {offset} with length {length} exceeds the \
         {available}-byte symbol table"
    )]
    SymbolSectionOutOfBounds {
        field: String,
        offset: usize,
        length: usize,
        available: usize,
    },

    #[error("field `{field}`: unknown symbol type tag {tag:#04x} at byte {offset}")]
    UnknownSymbolTag { field: String, tag: u8, offset: usize },

    #[error("field `{field}`: truncated symbol record at byte {offset}")]
    TruncatedSymbol { field: String, offset: usize },

    #[error("field `{field}`: symbol string at byte {offset} is not valid UTF-8")]
    SymbolString { field: String, offset: usize },

    #[error("field `{field}`: string symbols must not contain NUL bytes")]
    NulInString { field: String },

    #[error("index table length {declared} does not match {records} records of {record_size} bytes")]
    IndexLengthMismatch {
        declared: usize,
        records: usize,
        record_size: usize,
    },

    #[error("field `{field}`: bit width {width} exceeds 32")]
    BitWidthTooLarge { field: String, width: u32 },

    #[error("field `{field}`: {width} bits at bit offset {offset} fall outside the {record_bits}-bit record")]
    BitRangeOutOfRecord {
        field: String,
        offset: u32,
        width: u32,
        record_bits: u32,
    },

    #[error("record {record}, field `{field}`: code {code} is out of range for {symbols} symbols")]
    CodeOutOfRange {
        record: usize,
        field: String,
        code: i64,
        symbols: usize,
    },

    #[error("chunk size must be non-zero")]
    InvalidChunkSize,

    #[error(transparent)]
    Table(#[from] TableError),
}
