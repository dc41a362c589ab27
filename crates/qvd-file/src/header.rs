//! The XML descriptor block at the start of every QVD file.
//!
//! The header is UTF-8 XML terminated by `\r\n\0`; the byte after the NUL
//! is the first byte of the symbol table. Parsing is tree-based and
//! order-insensitive, emission is deterministic: fixed element order,
//! two-space indentation, CRLF line endings.

use qvd_model::{FormatKind, NumberFormat};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use roxmltree::{Document, Node};

use crate::QvdError;

pub(crate) const HEADER_TERMINATOR: &[u8] = b"\r\n\0";

const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

/// Per-field descriptor: symbol-section placement, bit layout within the
/// index record, and display metadata.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldHeader {
    pub field_name: String,
    /// Bit position of the field's code within a record, LSB of byte 0 = 0.
    pub bit_offset: u32,
    /// Zero when the column holds at most one symbol and no nulls.
    pub bit_width: u32,
    /// Signed offset added to the raw code; negative results are nulls.
    pub bias: i64,
    pub number_format: NumberFormat,
    pub no_of_symbols: usize,
    /// Byte offset of this field's symbols, relative to the symbol-table start.
    pub offset: usize,
    /// Byte length of this field's symbol section.
    pub length: usize,
    pub comment: String,
    pub tags: Vec<String>,
}

/// Source lineage entry carried in the header.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LineageInfo {
    pub discriminator: String,
    pub statement: String,
}

/// The parsed `QvdTableHeader` element.
#[derive(Clone, Debug, PartialEq)]
pub struct TableHeader {
    pub qv_build_no: u32,
    pub creator_doc: String,
    pub create_utc_time: String,
    pub source_create_utc_time: String,
    pub source_file_utc_time: String,
    pub stale_utc_time: String,
    pub table_name: String,
    pub source_file_size: i64,
    pub fields: Vec<FieldHeader>,
    pub compression: String,
    /// Bytes per index-table record.
    pub record_byte_size: usize,
    pub no_of_records: usize,
    /// Byte length of the symbol table (= index-table offset relative to
    /// the symbol-table start).
    pub offset: usize,
    /// Byte length of the index table.
    pub length: usize,
    pub comment: String,
    pub lineage: Vec<LineageInfo>,
}

impl Default for TableHeader {
    fn default() -> Self {
        TableHeader {
            qv_build_no: 50668,
            creator_doc: String::new(),
            create_utc_time: String::new(),
            source_create_utc_time: String::new(),
            source_file_utc_time: String::new(),
            stale_utc_time: String::new(),
            table_name: String::new(),
            source_file_size: -1,
            fields: Vec::new(),
            compression: String::new(),
            record_byte_size: 0,
            no_of_records: 0,
            offset: 0,
            length: 0,
            comment: String::new(),
            lineage: Vec::new(),
        }
    }
}

/// Find the `\r\n\0` terminator, scanning from `from` (callers pass the
/// previous buffer length minus the terminator overlap).
pub(crate) fn find_terminator(buffer: &[u8], from: usize) -> Option<usize> {
    let start = from.min(buffer.len());
    buffer[start..]
        .windows(HEADER_TERMINATOR.len())
        .position(|window| window == HEADER_TERMINATOR)
        .map(|pos| start + pos)
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.has_tag_name(name))
}

fn child_text<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    child(node, name).and_then(|n| n.text())
}

fn text_or_empty(node: Node<'_, '_>, name: &str) -> String {
    child_text(node, name).unwrap_or_default().to_string()
}

fn parse_number<T: std::str::FromStr>(
    node: Node<'_, '_>,
    name: &'static str,
    required: bool,
) -> Result<Option<T>, QvdError> {
    let Some(text) = child_text(node, name) else {
        if required {
            return Err(QvdError::MissingHeaderElement(name));
        }
        return Ok(None);
    };
    let trimmed = text.trim();
    trimmed
        .parse::<T>()
        .map(Some)
        .map_err(|_| QvdError::InvalidHeaderElement {
            element: name,
            value: trimmed.to_string(),
        })
}

fn required_number<T: std::str::FromStr>(
    node: Node<'_, '_>,
    name: &'static str,
) -> Result<T, QvdError> {
    parse_number(node, name, true)?.ok_or(QvdError::MissingHeaderElement(name))
}

fn optional_number<T: std::str::FromStr + Default>(
    node: Node<'_, '_>,
    name: &'static str,
) -> Result<T, QvdError> {
    Ok(parse_number(node, name, false)?.unwrap_or_default())
}

/// Parse a header block (including the trailing `\r\n\0`). A leading
/// UTF-8 BOM is tolerated.
pub(crate) fn parse_header(block: &[u8]) -> Result<TableHeader, QvdError> {
    let mut xml = block;
    if xml.ends_with(HEADER_TERMINATOR) {
        xml = &xml[..xml.len() - 1]; // keep the CRLF, drop the NUL
    }
    if xml.starts_with(UTF8_BOM) {
        xml = &xml[UTF8_BOM.len()..];
    }
    let text = std::str::from_utf8(xml).map_err(|_| QvdError::HeaderUtf8)?;
    let document = Document::parse(text)?;
    let root = document.root_element();

    let table_name = child_text(root, "TableName")
        .ok_or(QvdError::MissingHeaderElement("TableName"))?
        .to_string();

    let fields_node = child(root, "Fields").ok_or(QvdError::MissingHeaderElement("Fields"))?;
    let mut fields = Vec::new();
    for field_node in fields_node
        .children()
        .filter(|n| n.has_tag_name("QvdFieldHeader"))
    {
        fields.push(parse_field(field_node)?);
    }

    let lineage = child(root, "Lineage")
        .map(|node| {
            node.children()
                .filter(|n| n.has_tag_name("LineageInfo"))
                .map(|n| LineageInfo {
                    discriminator: text_or_empty(n, "Discriminator"),
                    statement: text_or_empty(n, "Statement"),
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(TableHeader {
        qv_build_no: optional_number(root, "QvBuildNo")?,
        creator_doc: text_or_empty(root, "CreatorDoc"),
        create_utc_time: text_or_empty(root, "CreateUtcTime"),
        source_create_utc_time: text_or_empty(root, "SourceCreateUtcTime"),
        source_file_utc_time: text_or_empty(root, "SourceFileUtcTime"),
        stale_utc_time: text_or_empty(root, "StaleUtcTime"),
        table_name,
        source_file_size: optional_number(root, "SourceFileSize")?,
        fields,
        compression: text_or_empty(root, "Compression"),
        record_byte_size: required_number(root, "RecordByteSize")?,
        no_of_records: required_number(root, "NoOfRecords")?,
        offset: required_number(root, "Offset")?,
        length: required_number(root, "Length")?,
        comment: text_or_empty(root, "Comment"),
        lineage,
    })
}

fn parse_field(node: Node<'_, '_>) -> Result<FieldHeader, QvdError> {
    let number_format = match child(node, "NumberFormat") {
        Some(format_node) => NumberFormat {
            kind: FormatKind::parse(child_text(format_node, "Type").unwrap_or("UNKNOWN")),
            n_dec: optional_number(format_node, "nDec")?,
            use_thou: optional_number(format_node, "UseThou")?,
            fmt: text_or_empty(format_node, "Fmt"),
            dec: text_or_empty(format_node, "Dec"),
            thou: text_or_empty(format_node, "Thou"),
        },
        None => NumberFormat::default(),
    };

    let tags = child(node, "Tags")
        .map(|tags_node| {
            tags_node
                .children()
                .filter(|n| n.has_tag_name("String"))
                .filter_map(|n| n.text())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(FieldHeader {
        field_name: child_text(node, "FieldName")
            .ok_or(QvdError::MissingHeaderElement("FieldName"))?
            .to_string(),
        bit_offset: required_number(node, "BitOffset")?,
        bit_width: required_number(node, "BitWidth")?,
        bias: required_number(node, "Bias")?,
        number_format,
        no_of_symbols: optional_number(node, "NoOfSymbols")?,
        offset: required_number(node, "Offset")?,
        length: required_number(node, "Length")?,
        comment: text_or_empty(node, "Comment"),
        tags,
    })
}

/// Serialize a header to its on-disk bytes, `\r\n\0` terminator included.
pub(crate) fn emit_header(header: &TableHeader) -> Result<Vec<u8>, QvdError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new("QvdTableHeader")))?;

    text_element(&mut writer, "QvBuildNo", &header.qv_build_no.to_string())?;
    text_element(&mut writer, "CreatorDoc", &header.creator_doc)?;
    text_element(&mut writer, "CreateUtcTime", &header.create_utc_time)?;
    text_element(&mut writer, "SourceCreateUtcTime", &header.source_create_utc_time)?;
    text_element(&mut writer, "SourceFileUtcTime", &header.source_file_utc_time)?;
    text_element(&mut writer, "StaleUtcTime", &header.stale_utc_time)?;
    text_element(&mut writer, "TableName", &header.table_name)?;
    text_element(&mut writer, "SourceFileSize", &header.source_file_size.to_string())?;

    writer.write_event(Event::Start(BytesStart::new("Fields")))?;
    for field in &header.fields {
        emit_field(&mut writer, field)?;
    }
    writer.write_event(Event::End(BytesEnd::new("Fields")))?;

    text_element(&mut writer, "Compression", &header.compression)?;
    text_element(&mut writer, "RecordByteSize", &header.record_byte_size.to_string())?;
    text_element(&mut writer, "NoOfRecords", &header.no_of_records.to_string())?;
    text_element(&mut writer, "Offset", &header.offset.to_string())?;
    text_element(&mut writer, "Length", &header.length.to_string())?;
    text_element(&mut writer, "Comment", &header.comment)?;

    writer.write_event(Event::Start(BytesStart::new("Lineage")))?;
    for lineage in &header.lineage {
        writer.write_event(Event::Start(BytesStart::new("LineageInfo")))?;
        text_element(&mut writer, "Discriminator", &lineage.discriminator)?;
        text_element(&mut writer, "Statement", &lineage.statement)?;
        writer.write_event(Event::End(BytesEnd::new("LineageInfo")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("Lineage")))?;

    writer.write_event(Event::End(BytesEnd::new("QvdTableHeader")))?;

    let xml = String::from_utf8(writer.into_inner()).map_err(|_| QvdError::HeaderUtf8)?;
    let mut bytes = xml.replace('\n', "\r\n").into_bytes();
    bytes.extend_from_slice(HEADER_TERMINATOR);
    Ok(bytes)
}

fn emit_field(writer: &mut Writer<Vec<u8>>, field: &FieldHeader) -> Result<(), QvdError> {
    writer.write_event(Event::Start(BytesStart::new("QvdFieldHeader")))?;
    text_element(writer, "FieldName", &field.field_name)?;
    text_element(writer, "BitOffset", &field.bit_offset.to_string())?;
    text_element(writer, "BitWidth", &field.bit_width.to_string())?;
    text_element(writer, "Bias", &field.bias.to_string())?;

    writer.write_event(Event::Start(BytesStart::new("NumberFormat")))?;
    text_element(writer, "Type", field.number_format.kind.as_str())?;
    text_element(writer, "nDec", &field.number_format.n_dec.to_string())?;
    text_element(writer, "UseThou", &field.number_format.use_thou.to_string())?;
    text_element(writer, "Fmt", &field.number_format.fmt)?;
    text_element(writer, "Dec", &field.number_format.dec)?;
    text_element(writer, "Thou", &field.number_format.thou)?;
    writer.write_event(Event::End(BytesEnd::new("NumberFormat")))?;

    text_element(writer, "NoOfSymbols", &field.no_of_symbols.to_string())?;
    text_element(writer, "Offset", &field.offset.to_string())?;
    text_element(writer, "Length", &field.length.to_string())?;
    text_element(writer, "Comment", &field.comment)?;

    writer.write_event(Event::Start(BytesStart::new("Tags")))?;
    for tag in &field.tags {
        text_element(writer, "String", tag)?;
    }
    writer.write_event(Event::End(BytesEnd::new("Tags")))?;

    writer.write_event(Event::End(BytesEnd::new("QvdFieldHeader")))?;
    Ok(())
}

fn text_element(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    text: &str,
) -> Result<(), QvdError> {
    // Empty elements are written self-closed; a `<Name></Name>` pair would
    // pick up indentation whitespace as bogus text content.
    if text.is_empty() {
        writer.write_event(Event::Empty(BytesStart::new(name)))?;
        return Ok(());
    }
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> TableHeader {
        TableHeader {
            table_name: "Sales".to_string(),
            create_utc_time: "2024-03-07T12:00:00".to_string(),
            record_byte_size: 1,
            no_of_records: 3,
            offset: 15,
            length: 3,
            fields: vec![FieldHeader {
                field_name: "Amount".to_string(),
                bit_width: 2,
                no_of_symbols: 3,
                length: 15,
                tags: vec!["$numeric".to_string(), "$integer".to_string()],
                ..FieldHeader::default()
            }],
            lineage: vec![LineageInfo {
                discriminator: "RESIDENT".to_string(),
                statement: "LOAD * FROM Sales".to_string(),
            }],
            ..TableHeader::default()
        }
    }

    #[test]
    fn emitted_header_parses_back() {
        let header = sample_header();
        let bytes = emit_header(&header).unwrap();
        assert!(bytes.ends_with(HEADER_TERMINATOR));
        assert_eq!(parse_header(&bytes).unwrap(), header);
    }

    #[test]
    fn emission_is_deterministic() {
        let header = sample_header();
        assert_eq!(emit_header(&header).unwrap(), emit_header(&header).unwrap());
    }

    #[test]
    fn parse_tolerates_bom_and_missing_optionals() {
        let xml = "<QvdTableHeader>\
                   <TableName>T</TableName>\
                   <Fields><QvdFieldHeader>\
                   <FieldName>A</FieldName>\
                   <BitOffset>0</BitOffset><BitWidth>0</BitWidth><Bias>0</Bias>\
                   <Offset>0</Offset><Length>5</Length>\
                   </QvdFieldHeader></Fields>\
                   <RecordByteSize>0</RecordByteSize><NoOfRecords>1</NoOfRecords>\
                   <Offset>5</Offset><Length>0</Length>\
                   </QvdTableHeader>";
        let mut block = Vec::new();
        block.extend_from_slice(UTF8_BOM);
        block.extend_from_slice(xml.as_bytes());
        block.extend_from_slice(HEADER_TERMINATOR);

        let header = parse_header(&block).unwrap();
        assert_eq!(header.table_name, "T");
        assert_eq!(header.fields.len(), 1);
        assert_eq!(header.fields[0].number_format, NumberFormat::default());
        assert_eq!(header.qv_build_no, 0);
    }

    #[test]
    fn missing_required_element_is_an_error() {
        let xml = b"<QvdTableHeader><TableName>T</TableName></QvdTableHeader>\r\n\0";
        assert!(matches!(
            parse_header(xml),
            Err(QvdError::MissingHeaderElement("Fields"))
        ));
    }
}
