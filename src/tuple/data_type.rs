use std::fmt;

use crate::common::{INT_FIELD_SIZE, STRING_LENGTH};

/// Represents the field types supported by heap pages.
/// Every type has a fixed encoded width, so every tuple of a schema
/// occupies the same number of bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// 64-bit signed integer: 8 bytes, little-endian
    Int,

    /// Fixed-width string: exactly n bytes, zero-padded
    Str(u16),
}

impl DataType {
    /// A string type with the default declared width.
    pub fn string() -> Self {
        DataType::Str(STRING_LENGTH as u16)
    }

    /// Returns the encoded size in bytes.
    pub fn fixed_size(&self) -> usize {
        match self {
            DataType::Int => INT_FIELD_SIZE,
            DataType::Str(n) => *n as usize,
        }
    }

    /// Parses a type name as written in a schema declaration.
    pub fn parse(name: &str) -> Option<Self> {
        let upper = name.trim().to_ascii_uppercase();
        match upper.as_str() {
            "INT" | "INTEGER" => Some(DataType::Int),
            "STRING" | "TEXT" => Some(DataType::string()),
            _ => {
                let inner = upper.strip_prefix("STRING(")?.strip_suffix(')')?;
                inner.trim().parse().ok().map(DataType::Str)
            }
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Int => write!(f, "INT"),
            DataType::Str(n) => write!(f, "STRING({})", n),
        }
    }
}
