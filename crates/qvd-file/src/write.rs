//! Writing QVD files.
//!
//! The writer scans the table once per column to build the on-disk
//! dictionaries (first-seen order, display text regenerated for formatted
//! kinds), computes the bit layout, and only then touches the sink:
//! header, symbol table, index table, in that order. All three sections
//! accumulate in growable buffers first.

use std::collections::HashMap;
use std::io::Write;

use qvd_format::{
    format_date, format_interval, format_time, format_timestamp, utc_timestamp, MoneyFormat,
};
use qvd_model::{Column, FormatKind, NumberFormat, QvdTable, Value};

use crate::header::{emit_header, FieldHeader, TableHeader};
use crate::index::{bits_for, pack_bits};
use crate::symbols::encode_symbol;
use crate::QvdError;

/// Options controlling header metadata and display regeneration.
///
/// Each pattern applies to columns of the corresponding
/// [`FormatKind`]: the display component of their dual symbols is
/// rewritten with it on the way out, and it becomes the field's `Fmt`
/// header element. Numeric components are never touched.
#[derive(Clone, Debug)]
pub struct WriteOptions {
    pub table_name: String,
    pub date_format: String,
    pub time_format: String,
    pub timestamp_format: String,
    pub interval_format: String,
    pub money_format: MoneyFormat,
    /// Value of the header's `CreateUtcTime`; `None` takes the current
    /// UTC time. Fix it to make the emitted bytes reproducible.
    pub create_utc_time: Option<String>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            table_name: "Table".to_string(),
            date_format: "YYYY-MM-DD".to_string(),
            time_format: "hh:mm:ss".to_string(),
            timestamp_format: "YYYY-MM-DD hh:mm:ss".to_string(),
            interval_format: "D hh:mm:ss".to_string(),
            money_format: MoneyFormat::default(),
            create_utc_time: None,
        }
    }
}

struct Dictionary {
    symbols: Vec<Value>,
    lookup: HashMap<Value, u32>,
    codes: Vec<Option<u32>>,
    has_null: bool,
}

impl Dictionary {
    fn build(column: &Column, rows: usize, options: &WriteOptions) -> Dictionary {
        let mut dictionary = Dictionary {
            symbols: Vec::new(),
            lookup: HashMap::new(),
            codes: Vec::with_capacity(rows),
            has_null: false,
        };
        let kind = column.format().kind;
        for row in 0..rows {
            let value = column.value(row);
            if value.is_null() {
                dictionary.has_null = true;
                dictionary.codes.push(None);
                continue;
            }
            let value = regenerate_display(value, kind, options);
            let code = match dictionary.lookup.get(&value) {
                Some(&code) => code,
                None => {
                    let code = dictionary.symbols.len() as u32;
                    dictionary.lookup.insert(value.clone(), code);
                    dictionary.symbols.push(value);
                    code
                }
            };
            dictionary.codes.push(Some(code));
        }
        dictionary
    }
}

/// Write `table` as a complete QVD file.
///
/// Nothing is written until every section has been encoded, so encode
/// errors leave the sink untouched; I/O errors mid-write leave it in an
/// undefined state the caller should discard.
pub fn write_qvd<W: Write>(
    mut sink: W,
    table: &QvdTable,
    options: &WriteOptions,
) -> Result<(), QvdError> {
    let rows = table.row_count();

    let dictionaries: Vec<Dictionary> = table
        .columns()
        .iter()
        .map(|column| Dictionary::build(column, rows, options))
        .collect();

    // Symbol sections plus per-field layout, columns in declared order.
    let mut symbol_buffer = Vec::new();
    let mut fields = Vec::with_capacity(table.column_count());
    let mut total_bits = 0u32;
    for (column, dictionary) in table.columns().iter().zip(&dictionaries) {
        let section_start = symbol_buffer.len();
        for symbol in &dictionary.symbols {
            encode_symbol(&mut symbol_buffer, symbol, column.name())?;
        }

        let (bit_width, bias) = if !dictionary.has_null && dictionary.symbols.len() <= 1 {
            (0, 0)
        } else {
            let slots = dictionary.symbols.len() + usize::from(dictionary.has_null);
            (bits_for(slots), if dictionary.has_null { -1 } else { 0 })
        };

        fields.push(FieldHeader {
            field_name: column.name().to_string(),
            bit_offset: total_bits,
            bit_width,
            bias,
            number_format: field_number_format(column, options),
            no_of_symbols: dictionary.symbols.len(),
            offset: section_start,
            length: symbol_buffer.len() - section_start,
            comment: String::new(),
            tags: field_tags(column, &dictionary.symbols),
        });
        total_bits += bit_width;
    }

    let record_byte_size = (total_bits as usize + 7) / 8;
    let mut index_buffer = vec![0u8; rows * record_byte_size];
    for row in 0..rows {
        let record = &mut index_buffer[row * record_byte_size..(row + 1) * record_byte_size];
        for (field, dictionary) in fields.iter().zip(&dictionaries) {
            let raw = match dictionary.codes[row] {
                // Raw zero is the reserved null slot of a biased column.
                None => 0,
                Some(code) => code + u32::from(dictionary.has_null),
            };
            pack_bits(record, field.bit_offset, field.bit_width, raw);
        }
    }

    let header = TableHeader {
        create_utc_time: options
            .create_utc_time
            .clone()
            .unwrap_or_else(utc_timestamp),
        table_name: options.table_name.clone(),
        fields,
        record_byte_size,
        no_of_records: rows,
        offset: symbol_buffer.len(),
        length: index_buffer.len(),
        ..TableHeader::default()
    };

    sink.write_all(&emit_header(&header)?)?;
    sink.write_all(&symbol_buffer)?;
    sink.write_all(&index_buffer)?;
    Ok(())
}

/// Rewrite the display component of dual values in formatted columns.
/// Non-dual values have no display component and pass through.
fn regenerate_display(value: &Value, kind: FormatKind, options: &WriteOptions) -> Value {
    let number = match value {
        Value::DualInteger(v, _) => f64::from(*v),
        Value::DualDouble(v, _) => *v,
        _ => return value.clone(),
    };
    let text = match kind {
        FormatKind::Date => format_date(number as i64, &options.date_format),
        FormatKind::Time => format_time(number, &options.time_format),
        FormatKind::Timestamp => format_timestamp(number, &options.timestamp_format),
        FormatKind::Interval => format_interval(number, &options.interval_format),
        FormatKind::Money => options.money_format.format(number),
        _ => return value.clone(),
    };
    match value {
        Value::DualInteger(v, _) => Value::DualInteger(*v, text),
        Value::DualDouble(v, _) => Value::DualDouble(*v, text),
        _ => value.clone(),
    }
}

fn field_number_format(column: &Column, options: &WriteOptions) -> NumberFormat {
    let mut format = column.format().clone();
    match format.kind {
        FormatKind::Date => format.fmt = options.date_format.clone(),
        FormatKind::Time => format.fmt = options.time_format.clone(),
        FormatKind::Timestamp => format.fmt = options.timestamp_format.clone(),
        FormatKind::Interval => format.fmt = options.interval_format.clone(),
        FormatKind::Money => {
            let money = &options.money_format;
            format.fmt = money.qvd_pattern();
            format.dec = money.decimal_separator.clone();
            format.thou = money.thousand_separator.clone();
            format.n_dec = money.precision as u32;
            format.use_thou = u32::from(!money.thousand_separator.is_empty());
        }
        _ => {}
    }
    format
}

/// Tags carried on the column win; otherwise synthesize them from the
/// format kind and, failing that, from the symbol variants.
fn field_tags(column: &Column, symbols: &[Value]) -> Vec<String> {
    if !column.tags().is_empty() {
        return column.tags().to_vec();
    }
    let tags: &[&str] = match column.format().kind {
        FormatKind::Date => &["$date", "$numeric", "$integer"],
        FormatKind::Timestamp => &["$timestamp", "$numeric"],
        FormatKind::Time | FormatKind::Interval | FormatKind::Money => &["$numeric"],
        _ => {
            if symbols.is_empty() {
                &[]
            } else if symbols.iter().all(|s| matches!(s, Value::Integer(_))) {
                &["$numeric", "$integer"]
            } else if symbols.iter().all(|s| s.calculation_value().is_some()) {
                &["$numeric"]
            } else if symbols.iter().all(|s| matches!(s, Value::String(_))) {
                if symbols.iter().all(|s| s.display_value().is_ascii()) {
                    &["$text", "$ascii"]
                } else {
                    &["$text"]
                }
            } else {
                &[]
            }
        }
    };
    tags.iter().map(|t| t.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{find_terminator, parse_header};

    fn written_sections(table: &QvdTable) -> (TableHeader, Vec<u8>, Vec<u8>) {
        let mut bytes = Vec::new();
        write_qvd(&mut bytes, table, &WriteOptions::default()).unwrap();

        let terminator = find_terminator(&bytes, 0).unwrap();
        let header_end = terminator + 3;
        let header = parse_header(&bytes[..header_end]).unwrap();
        let symbols = bytes[header_end..header_end + header.offset].to_vec();
        let index = bytes[header_end + header.offset..].to_vec();
        assert_eq!(index.len(), header.length);
        (header, symbols, index)
    }

    #[test]
    fn minimal_integer_column_layout() {
        let table = QvdTable::from_columns([(
            "A".to_string(),
            vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)],
        )])
        .unwrap();
        let (header, symbols, index) = written_sections(&table);

        assert_eq!(header.no_of_records, 3);
        assert_eq!(header.record_byte_size, 1);
        assert_eq!(header.fields[0].bit_width, 2);
        assert_eq!(header.fields[0].bias, 0);
        // Three tag-0x01 records of five bytes each.
        assert_eq!(symbols.len(), 15);
        assert_eq!(index, vec![0, 1, 2]);
        assert_eq!(
            header.fields[0].tags,
            vec!["$numeric".to_string(), "$integer".to_string()]
        );
    }

    #[test]
    fn nullable_column_reserves_raw_zero() {
        let table = QvdTable::from_columns([(
            "A".to_string(),
            vec![Value::Integer(10), Value::Null, Value::Integer(20)],
        )])
        .unwrap();
        let (header, _, index) = written_sections(&table);

        assert_eq!(header.fields[0].bit_width, 2);
        assert_eq!(header.fields[0].bias, -1);
        assert_eq!(index, vec![1, 0, 2]);
    }

    #[test]
    fn duals_dedupe_by_full_equality() {
        let table = QvdTable::from_columns([(
            "Day".to_string(),
            vec![
                Value::DualInteger(1, "Mon".to_string()),
                Value::DualInteger(2, "Tue".to_string()),
                Value::DualInteger(1, "Mon".to_string()),
            ],
        )])
        .unwrap();
        let (header, symbols, index) = written_sections(&table);

        assert_eq!(header.fields[0].no_of_symbols, 2);
        // Two tag-0x05 records: 1 + 4 + 4 ("Mon\0" / "Tue\0") bytes each.
        assert_eq!(symbols.len(), 18);
        assert_eq!(header.fields[0].bit_width, 1);
        assert_eq!(index, vec![0, 1, 0]);
    }

    #[test]
    fn single_valued_column_occupies_no_bits() {
        let table = QvdTable::from_columns([
            (
                "Constant".to_string(),
                vec![Value::Integer(9), Value::Integer(9)],
            ),
            (
                "Varying".to_string(),
                vec![Value::Integer(1), Value::Integer(2)],
            ),
        ])
        .unwrap();
        let (header, _, index) = written_sections(&table);

        assert_eq!(header.fields[0].bit_width, 0);
        assert_eq!(header.fields[0].bias, 0);
        assert_eq!(header.fields[1].bit_offset, 0);
        assert_eq!(header.record_byte_size, 1);
        assert_eq!(index, vec![0, 1]);
    }

    #[test]
    fn empty_table_writes_empty_sections() {
        let table = QvdTable::new();
        let (header, symbols, index) = written_sections(&table);
        assert_eq!(header.no_of_records, 0);
        assert_eq!(header.record_byte_size, 0);
        assert!(symbols.is_empty());
        assert!(index.is_empty());
    }

    #[test]
    fn mixed_column_writes_both_tags() {
        let table = QvdTable::from_columns([(
            "A".to_string(),
            vec![Value::Integer(1), Value::String("x".to_string())],
        )])
        .unwrap();
        let (_, symbols, _) = written_sections(&table);
        assert_eq!(symbols[0], 0x01);
        assert_eq!(symbols[5], 0x04);
    }
}
