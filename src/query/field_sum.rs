use std::fs::{self, File};
use std::io::{BufReader, ErrorKind};
use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::buffer::BufferPool;
use crate::common::{HeapError, Result, DEFAULT_BUFFER_POOL_SIZE};
use crate::storage::heap::HeapFile;
use crate::tuple::{DataType, Schema, Value};

/// Loads a comma-separated file with a header row into a fresh heap file
/// at `db_path` and returns the sum of the integer column `field`.
///
/// Any existing file at `db_path` is replaced so repeated runs don't
/// accumulate rows.
pub fn compute_field_sum<P: AsRef<Path>, Q: AsRef<Path>>(
    csv_path: P,
    db_path: Q,
    schema: Arc<Schema>,
    field: &str,
) -> Result<i64> {
    let index = schema
        .column_index(field)
        .ok_or_else(|| HeapError::FieldNotFound(field.to_string()))?;
    if schema.column(index).map(|c| *c.data_type()) != Some(DataType::Int) {
        return Err(HeapError::SchemaMismatch(format!(
            "field {} is not an integer",
            field
        )));
    }

    let csv = File::open(csv_path)?;
    match fs::remove_file(&db_path) {
        Err(e) if e.kind() != ErrorKind::NotFound => return Err(e.into()),
        _ => {}
    }

    let pool = Arc::new(BufferPool::new(DEFAULT_BUFFER_POOL_SIZE));
    let file = HeapFile::new(&db_path, schema, pool)?;
    let rows = file.load_from_csv(BufReader::new(csv), true, ',', false)?;

    let mut sum = 0i64;
    for tuple in file.iter() {
        if let Some(Value::Int(v)) = tuple?.value(index) {
            sum = sum.wrapping_add(*v);
        }
    }

    info!(field, rows, sum, "computed field sum");
    Ok(sum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn schema() -> Arc<Schema> {
        Schema::builder()
            .column("name", DataType::string())
            .column("age", DataType::Int)
            .build_arc()
    }

    fn write_csv(contents: &str) -> NamedTempFile {
        let mut csv = NamedTempFile::new().unwrap();
        csv.write_all(contents.as_bytes()).unwrap();
        csv.flush().unwrap();
        csv
    }

    #[test]
    fn test_compute_field_sum() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("sum.dat");
        let csv = write_csv("name,age\nsam,25\ntim,44\nmo,1\n");

        let sum = compute_field_sum(csv.path(), &db_path, schema(), "age").unwrap();
        assert_eq!(sum, 70);

        // A second run starts from an empty heap file
        let sum = compute_field_sum(csv.path(), &db_path, schema(), "age").unwrap();
        assert_eq!(sum, 70);
    }

    #[test]
    fn test_compute_field_sum_bad_field() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("sum.dat");
        let csv = write_csv("name,age\nsam,25\n");

        assert!(matches!(
            compute_field_sum(csv.path(), &db_path, schema(), "height"),
            Err(HeapError::FieldNotFound(_))
        ));
        assert!(matches!(
            compute_field_sum(csv.path(), &db_path, schema(), "name"),
            Err(HeapError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_compute_field_sum_missing_csv() {
        let dir = TempDir::new().unwrap();
        let err = compute_field_sum(
            dir.path().join("nope.csv"),
            dir.path().join("sum.dat"),
            schema(),
            "age",
        )
        .unwrap_err();
        assert!(matches!(err, HeapError::Io(_)));
    }
}
