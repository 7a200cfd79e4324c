use std::collections::HashMap;
use std::sync::Arc;

use crate::common::{HeapError, Result};

use super::DataType;

/// A named, fixed-width field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    name: String,
    data_type: DataType,
    /// Byte offset of the field inside an encoded record
    offset: usize,
}

impl Column {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Byte offset of this field inside an encoded record.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Encoded width in bytes.
    pub fn width(&self) -> usize {
        self.data_type.fixed_size()
    }
}

/// The tuple descriptor: ordered, fixed-width columns.
///
/// Every tuple of a schema encodes to exactly `record_width()` bytes,
/// which is what heap pages use to derive their slot capacity. Two
/// schemas are equal when their columns match in name, type and order.
#[derive(Debug, Clone)]
pub struct Schema {
    columns: Vec<Column>,
    by_name: HashMap<String, usize>,
    record_width: usize,
}

impl Schema {
    /// Lays out `fields` back to back in the given order.
    ///
    /// When a name repeats, lookups by name find the last column with it.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, DataType)>,
        S: Into<String>,
    {
        let mut columns = Vec::new();
        let mut by_name = HashMap::new();
        let mut offset = 0;

        for (index, (name, data_type)) in fields.into_iter().enumerate() {
            let name = name.into();
            by_name.insert(name.clone(), index);
            columns.push(Column {
                name,
                data_type,
                offset,
            });
            offset += data_type.fixed_size();
        }

        Self {
            columns,
            by_name,
            record_width: offset,
        }
    }

    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Parses a declaration such as `"name string, age int"`.
    pub fn parse(declaration: &str) -> Result<Self> {
        let mut builder = SchemaBuilder::default();
        for part in declaration.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (name, type_name) = part.split_once(char::is_whitespace).ok_or_else(|| {
                HeapError::SchemaMismatch(format!("column `{}` has no type", part))
            })?;
            let data_type = DataType::parse(type_name).ok_or_else(|| {
                HeapError::SchemaMismatch(format!("unknown type `{}`", type_name.trim()))
            })?;
            builder = builder.column(name, data_type);
        }
        Ok(builder.build())
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.column_index(name).map(|i| &self.columns[i])
    }

    /// Position of the named column, if the schema has one.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter()
    }

    /// Encoded size of one tuple in bytes.
    pub fn record_width(&self) -> usize {
        self.record_width
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns
    }
}

impl Eq for Schema {}

/// Collects columns for [`Schema::new`].
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<(String, DataType)>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn column(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.fields.push((name.into(), data_type));
        self
    }

    pub fn build(self) -> Schema {
        Schema::new(self.fields)
    }

    pub fn build_arc(self) -> Arc<Schema> {
        Arc::new(self.build())
    }
}
