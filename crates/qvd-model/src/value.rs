use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// A single cell value as stored in a QVD symbol table.
///
/// The enum uses an explicit `{type, value}` tagged layout for stable IPC.
/// Higher-level interpretations (date, time, money, ...) are not distinct
/// variants; they are projections of the dual variants driven by the
/// column's [`NumberFormat`](crate::NumberFormat).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// Absent cell. Encoded out-of-band in the index table, never as a symbol.
    Null,
    /// Signed 32-bit integer.
    Integer(i32),
    /// IEEE-754 double precision number.
    Double(f64),
    /// Plain text. Held without the on-disk NUL terminator.
    String(String),
    /// Integer with an attached display text (dates, flags, ...).
    DualInteger(i32, String),
    /// Double with an attached display text (timestamps, money, ...).
    DualDouble(f64, String),
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl Value {
    /// Returns true if the value is [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The numeric projection used for ordering and predicates.
    ///
    /// Plain strings and nulls have none.
    pub fn calculation_value(&self) -> Option<f64> {
        match self {
            Value::Null | Value::String(_) => None,
            Value::Integer(v) => Some(f64::from(*v)),
            Value::Double(v) => Some(*v),
            Value::DualInteger(v, _) => Some(f64::from(*v)),
            Value::DualDouble(v, _) => Some(*v),
        }
    }

    /// The text rendering of the value: the dual string component when
    /// present, otherwise a canonical rendering of the numeric component.
    pub fn display_value(&self) -> Cow<'_, str> {
        match self {
            Value::Null => Cow::Borrowed(""),
            Value::Integer(v) => Cow::Owned(v.to_string()),
            Value::Double(v) => Cow::Owned(v.to_string()),
            Value::String(s) => Cow::Borrowed(s),
            Value::DualInteger(_, s) | Value::DualDouble(_, s) => Cow::Borrowed(s),
        }
    }

    /// Total order used by table sorts.
    ///
    /// Ascending numeric order over the calculation values when both sides
    /// have one, with NaN greater than every number and ties broken by
    /// display text; display-text order otherwise. Null sorts first.
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        match (self.is_null(), other.is_null()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => {}
        }

        match (self.calculation_value(), other.calculation_value()) {
            (Some(a), Some(b)) => {
                cmp_numeric(a, b).then_with(|| self.display_value().cmp(&other.display_value()))
            }
            _ => self.display_value().cmp(&other.display_value()),
        }
    }
}

fn cmp_numeric(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Equality is kind-wise and bitwise: doubles compare by bit pattern so
/// that ±0 and distinct NaNs stay distinguishable, which keeps symbol
/// dictionaries stable across round trips.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::DualInteger(a, s), Value::DualInteger(b, t)) => a == b && s == t,
            (Value::DualDouble(a, s), Value::DualDouble(b, t)) => {
                a.to_bits() == b.to_bits() && s == t
            }
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Integer(v) => v.hash(state),
            Value::Double(v) => v.to_bits().hash(state),
            Value::String(s) => s.hash(state),
            Value::DualInteger(v, s) => {
                v.hash(state);
                s.hash(state);
            }
            Value::DualDouble(v, s) => {
                v.to_bits().hash(state);
                s.hash(state);
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_value())
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v)
    }
}

impl From<i64> for Value {
    /// Values outside the signed 32-bit range are widened to [`Value::Double`]
    /// (the symbol encoding has no 64-bit integer record).
    fn from(v: i64) -> Self {
        match i32::try_from(v) {
            Ok(v) => Value::Integer(v),
            Err(_) => {
                log::warn!("integer {v} does not fit 32 bits; widening to double");
                Value::Double(v as f64)
            }
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        if v {
            Value::DualInteger(1, "true".to_string())
        } else {
            Value::DualInteger(0, "false".to_string())
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_bitwise_for_doubles() {
        assert_eq!(Value::Double(0.0), Value::Double(0.0));
        assert_ne!(Value::Double(0.0), Value::Double(-0.0));
        assert_eq!(Value::Double(f64::NAN), Value::Double(f64::NAN));
        assert_ne!(Value::Integer(1), Value::Double(1.0));
    }

    #[test]
    fn duals_compare_both_components() {
        let a = Value::DualInteger(1, "Mon".to_string());
        let b = Value::DualInteger(1, "Mon".to_string());
        let c = Value::DualInteger(1, "Tue".to_string());
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn ordering_null_first_nan_last() {
        let mut values = vec![
            Value::Double(f64::NAN),
            Value::Integer(3),
            Value::Null,
            Value::Double(1.5),
        ];
        values.sort_by(|a, b| a.total_cmp(b));
        assert!(values[0].is_null());
        assert_eq!(values[1], Value::Double(1.5));
        assert_eq!(values[2], Value::Integer(3));
        assert!(matches!(values[3], Value::Double(v) if v.is_nan()));
    }

    #[test]
    fn strings_order_lexically() {
        let a = Value::String("apple".to_string());
        let b = Value::String("banana".to_string());
        assert_eq!(a.total_cmp(&b), Ordering::Less);
    }

    #[test]
    fn wide_integers_widen_to_double() {
        assert_eq!(Value::from(42i64), Value::Integer(42));
        assert_eq!(
            Value::from(10_000_000_000i64),
            Value::Double(10_000_000_000.0)
        );
    }

    #[test]
    fn booleans_convert_to_duals() {
        assert_eq!(Value::from(true), Value::DualInteger(1, "true".to_string()));
        assert_eq!(
            Value::from(false),
            Value::DualInteger(0, "false".to_string())
        );
    }
}
