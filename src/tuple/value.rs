use std::fmt;

use bytes::{Buf, BufMut};

use crate::common::{HeapError, Result};

use super::DataType;

/// Represents a typed field value stored in a tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Value {
    /// 64-bit signed integer
    Int(i64),

    /// String value
    Str(String),
}

impl Value {
    /// Returns the integer payload, if this is an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Str(_) => None,
        }
    }

    /// Returns the string payload, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            Value::Int(_) => None,
        }
    }

    /// Writes the value with the exact width of `data_type`.
    ///
    /// Strings longer than the declared width are truncated at the last
    /// character boundary that fits; shorter strings are zero-padded.
    pub fn write_to(&self, data_type: &DataType, buf: &mut impl BufMut) -> Result<()> {
        let width = data_type.fixed_size();
        if buf.remaining_mut() < width {
            return Err(HeapError::Encoding(format!(
                "{} bytes left, field needs {}",
                buf.remaining_mut(),
                width
            )));
        }

        match (self, data_type) {
            (Value::Int(v), DataType::Int) => buf.put_i64_le(*v),
            (Value::Str(s), DataType::Str(n)) => {
                let n = *n as usize;
                let mut end = s.len().min(n);
                while !s.is_char_boundary(end) {
                    end -= 1;
                }
                buf.put_slice(&s.as_bytes()[..end]);
                buf.put_bytes(0, n - end);
            }
            (value, expected) => {
                return Err(HeapError::SchemaMismatch(format!(
                    "value {} cannot be stored as {}",
                    value, expected
                )))
            }
        }
        Ok(())
    }

    /// Reads a value of `data_type`, consuming exactly its width.
    pub fn read_from(data_type: &DataType, buf: &mut impl Buf) -> Result<Self> {
        let width = data_type.fixed_size();
        if buf.remaining() < width {
            return Err(HeapError::Decoding(format!(
                "{} bytes left, {} field needs {}",
                buf.remaining(),
                data_type,
                width
            )));
        }

        match data_type {
            DataType::Int => Ok(Value::Int(buf.get_i64_le())),
            DataType::Str(_) => {
                let mut raw = vec![0u8; width];
                buf.copy_to_slice(&mut raw);
                let len = raw.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
                raw.truncate(len);
                String::from_utf8(raw)
                    .map(Value::Str)
                    .map_err(|e| HeapError::Decoding(format!("invalid string field: {}", e)))
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Str(s) => write!(f, "'{}'", s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}
