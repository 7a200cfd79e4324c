use std::fmt;
use std::sync::Arc;

use bytes::{Buf, BufMut};

use crate::common::{HeapError, RecordId, Result};

use super::{DataType, Schema, Value};

/// A row of values laid out by a schema.
///
/// A tuple holds one value per schema column and, once it has been placed
/// in a heap page, the record ID of the slot it lives in.
///
/// # Encoding
///
/// Fields are written back to back in column order with no header:
///
/// ```text
/// +-----------+-----------+-----+-----------+
/// | Field 0   | Field 1   | ... | Field n-1 |
/// +-----------+-----------+-----+-----------+
/// ```
///
/// - **Int**: 8 bytes, little-endian two's complement
/// - **Str(n)**: n bytes of UTF-8, zero-padded, truncated to fit
///
/// The encoded size is always `schema.record_width()`.
#[derive(Debug, Clone)]
pub struct Tuple {
    schema: Arc<Schema>,

    /// One per column, in column order
    values: Vec<Value>,

    /// Position in a heap page, set on insert and on page load
    rid: Option<RecordId>,
}

impl Tuple {
    /// Creates a new tuple, checking values against the schema.
    pub fn new(schema: Arc<Schema>, values: Vec<Value>) -> Result<Self> {
        if values.len() != schema.column_count() {
            return Err(HeapError::SchemaMismatch(format!(
                "expected {} values, got {}",
                schema.column_count(),
                values.len()
            )));
        }

        for (col, value) in schema.columns().zip(&values) {
            let matches = matches!(
                (col.data_type(), value),
                (DataType::Int, Value::Int(_)) | (DataType::Str(_), Value::Str(_))
            );
            if !matches {
                return Err(HeapError::SchemaMismatch(format!(
                    "column {} is {}, got {}",
                    col.name(),
                    col.data_type(),
                    value
                )));
            }
        }

        Ok(Self {
            schema,
            values,
            rid: None,
        })
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn value_by_name(&self, name: &str) -> Option<&Value> {
        self.schema
            .column_index(name)
            .and_then(|i| self.values.get(i))
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the record ID assigned by the page holding this tuple.
    pub fn rid(&self) -> Option<RecordId> {
        self.rid
    }

    pub(crate) fn set_rid(&mut self, rid: Option<RecordId>) {
        self.rid = rid;
    }

    /// Writes the encoded tuple to `buf`.
    pub fn write_to(&self, buf: &mut impl BufMut) -> Result<()> {
        let width = self.schema.record_width();
        if buf.remaining_mut() < width {
            return Err(HeapError::Encoding(format!(
                "{} bytes left, tuple needs {}",
                buf.remaining_mut(),
                width
            )));
        }

        for (col, value) in self.schema.columns().zip(&self.values) {
            value.write_to(col.data_type(), buf)?;
        }
        Ok(())
    }

    /// Serializes the tuple to a freshly allocated buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(self.schema.record_width());
        self.write_to(&mut bytes)?;
        Ok(bytes)
    }

    /// Reads one tuple of `schema` from `buf`.
    pub fn read_from(schema: Arc<Schema>, buf: &mut impl Buf) -> Result<Self> {
        if buf.remaining() < schema.record_width() {
            return Err(HeapError::Decoding(format!(
                "{} bytes left, tuple needs {}",
                buf.remaining(),
                schema.record_width()
            )));
        }

        let values = schema
            .columns()
            .map(|col| Value::read_from(col.data_type(), buf))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            schema,
            values,
            rid: None,
        })
    }

    /// Decodes one tuple from the front of `data`.
    pub fn from_bytes(schema: Arc<Schema>, data: &[u8]) -> Result<Self> {
        Self::read_from(schema, &mut &data[..])
    }
}

/// Equality compares schema and values; the record ID is a location,
/// not part of the tuple's identity.
impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.schema == other.schema && self.values == other.values
    }
}

impl Eq for Tuple {}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, ")")
    }
}

/// Accumulates values column by column; `build` validates them.
pub struct TupleBuilder {
    schema: Arc<Schema>,
    values: Vec<Value>,
}

impl TupleBuilder {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            values: Vec::with_capacity(schema.column_count()),
            schema,
        }
    }

    /// Appends the value for the next column.
    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.values.push(value.into());
        self
    }

    pub fn build(self) -> Result<Tuple> {
        Tuple::new(self.schema, self.values)
    }
}
