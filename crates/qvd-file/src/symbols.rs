//! The column-major symbol table.
//!
//! Each field owns a byte range of type-tagged records:
//!
//! | tag  | body                                        |
//! |------|---------------------------------------------|
//! | 0x01 | 4-byte LE signed integer                    |
//! | 0x02 | 8-byte LE IEEE-754 double                   |
//! | 0x04 | NUL-terminated UTF-8 string                 |
//! | 0x05 | 4-byte LE integer, then NUL-terminated text |
//! | 0x06 | 8-byte LE double, then NUL-terminated text  |

use qvd_model::Value;

use crate::header::FieldHeader;
use crate::QvdError;

const TAG_INT: u8 = 0x01;
const TAG_DOUBLE: u8 = 0x02;
const TAG_STRING: u8 = 0x04;
const TAG_DUAL_INT: u8 = 0x05;
const TAG_DUAL_DOUBLE: u8 = 0x06;

/// Decode one field's symbol section out of the symbol-table buffer.
///
/// The section is `field.length` bytes at `field.offset`; it must hold a
/// whole number of records. Offsets in errors are relative to the
/// symbol-table start.
pub(crate) fn decode_column(buffer: &[u8], field: &FieldHeader) -> Result<Vec<Value>, QvdError> {
    let end = field.offset.checked_add(field.length).filter(|&e| e <= buffer.len());
    let Some(end) = end else {
        return Err(QvdError::SymbolSectionOutOfBounds {
            field: field.field_name.clone(),
            offset: field.offset,
            length: field.length,
            available: buffer.len(),
        });
    };

    let mut symbols = Vec::new();
    let mut cursor = Cursor {
        buffer,
        position: field.offset,
        end,
        field,
    };
    while !cursor.at_end() {
        symbols.push(cursor.read_symbol()?);
    }

    if field.no_of_symbols != 0 && field.no_of_symbols != symbols.len() {
        log::warn!(
            "field `{}` declares {} symbols but {} were decoded",
            field.field_name,
            field.no_of_symbols,
            symbols.len()
        );
    }
    Ok(symbols)
}

struct Cursor<'a> {
    buffer: &'a [u8],
    position: usize,
    end: usize,
    field: &'a FieldHeader,
}

impl Cursor<'_> {
    fn at_end(&self) -> bool {
        self.position >= self.end
    }

    fn truncated(&self, at: usize) -> QvdError {
        QvdError::TruncatedSymbol {
            field: self.field.field_name.clone(),
            offset: at,
        }
    }

    fn read_symbol(&mut self) -> Result<Value, QvdError> {
        let record_start = self.position;
        let tag = self.buffer[self.position];
        self.position += 1;
        match tag {
            TAG_INT => Ok(Value::Integer(self.read_i32(record_start)?)),
            TAG_DOUBLE => Ok(Value::Double(self.read_f64(record_start)?)),
            TAG_STRING => Ok(Value::String(self.read_string(record_start)?)),
            TAG_DUAL_INT => {
                let number = self.read_i32(record_start)?;
                let text = self.read_string(record_start)?;
                Ok(Value::DualInteger(number, text))
            }
            TAG_DUAL_DOUBLE => {
                let number = self.read_f64(record_start)?;
                let text = self.read_string(record_start)?;
                Ok(Value::DualDouble(number, text))
            }
            tag => Err(QvdError::UnknownSymbolTag {
                field: self.field.field_name.clone(),
                tag,
                offset: record_start,
            }),
        }
    }

    fn read_i32(&mut self, record_start: usize) -> Result<i32, QvdError> {
        let bytes: [u8; 4] = self
            .buffer
            .get(self.position..self.position + 4)
            .filter(|_| self.position + 4 <= self.end)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| self.truncated(record_start))?;
        self.position += 4;
        Ok(i32::from_le_bytes(bytes))
    }

    fn read_f64(&mut self, record_start: usize) -> Result<f64, QvdError> {
        let bytes: [u8; 8] = self
            .buffer
            .get(self.position..self.position + 8)
            .filter(|_| self.position + 8 <= self.end)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| self.truncated(record_start))?;
        self.position += 8;
        Ok(f64::from_le_bytes(bytes))
    }

    fn read_string(&mut self, record_start: usize) -> Result<String, QvdError> {
        let slice = &self.buffer[self.position..self.end];
        let nul = slice
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| self.truncated(record_start))?;
        let text = std::str::from_utf8(&slice[..nul]).map_err(|_| QvdError::SymbolString {
            field: self.field.field_name.clone(),
            offset: self.position,
        })?;
        self.position += nul + 1;
        Ok(text.to_string())
    }
}

/// Append one symbol's on-disk record. Null is never a symbol; the caller
/// filters it out of the dictionary.
pub(crate) fn encode_symbol(
    out: &mut Vec<u8>,
    value: &Value,
    field_name: &str,
) -> Result<(), QvdError> {
    match value {
        Value::Null => unreachable!("null cells are encoded in the index table, not as symbols"),
        Value::Integer(v) => {
            out.push(TAG_INT);
            out.extend_from_slice(&v.to_le_bytes());
        }
        Value::Double(v) => {
            out.push(TAG_DOUBLE);
            out.extend_from_slice(&v.to_le_bytes());
        }
        Value::String(s) => {
            out.push(TAG_STRING);
            push_terminated(out, s, field_name)?;
        }
        Value::DualInteger(v, s) => {
            out.push(TAG_DUAL_INT);
            out.extend_from_slice(&v.to_le_bytes());
            push_terminated(out, s, field_name)?;
        }
        Value::DualDouble(v, s) => {
            out.push(TAG_DUAL_DOUBLE);
            out.extend_from_slice(&v.to_le_bytes());
            push_terminated(out, s, field_name)?;
        }
    }
    Ok(())
}

fn push_terminated(out: &mut Vec<u8>, text: &str, field_name: &str) -> Result<(), QvdError> {
    if text.as_bytes().contains(&0) {
        return Err(QvdError::NulInString {
            field: field_name.to_string(),
        });
    }
    out.extend_from_slice(text.as_bytes());
    out.push(0);
    Ok(())
}
