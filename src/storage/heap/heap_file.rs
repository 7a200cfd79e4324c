use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::buffer::BufferPool;
use crate::common::{FileId, HeapError, PageId, RecordId, Result, PAGE_SIZE};
use crate::storage::disk::DiskManager;
use crate::storage::page::HeapPage;
use crate::tuple::{DataType, Schema, Tuple, Value};

/// An unordered collection of tuples stored as a sequence of heap pages.
///
/// Page access goes through the buffer pool; the heap file itself only
/// reads and writes whole pages on behalf of the pool.
#[derive(Debug)]
pub struct HeapFile {
    /// Entry in the buffer pool's file table
    id: FileId,
    /// Schema shared by every tuple in the file
    schema: Arc<Schema>,
    /// Backing file
    disk: Arc<DiskManager>,
    /// Pool that caches this file's pages
    pool: Arc<BufferPool>,
}

impl HeapFile {
    /// Opens (or creates) the heap file at `path` and registers it with
    /// `pool`.
    pub fn new<P: AsRef<Path>>(path: P, schema: Arc<Schema>, pool: Arc<BufferPool>) -> Result<Self> {
        if HeapPage::slot_capacity(&schema)? == 0 {
            return Err(HeapError::SchemaMismatch(format!(
                "records of {} bytes do not fit on a page",
                schema.record_width()
            )));
        }
        let disk = Arc::new(DiskManager::new(path)?);
        let id = pool.register_file(Arc::clone(&disk));
        Ok(Self {
            id,
            schema,
            disk,
            pool,
        })
    }

    /// Returns the file ID assigned by the buffer pool.
    pub fn id(&self) -> FileId {
        self.id
    }

    /// Returns the schema of the file's tuples.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Returns the buffer pool caching this file.
    pub fn pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }

    /// Returns the number of pages in the file.
    pub fn num_pages(&self) -> u32 {
        self.disk.num_pages()
    }

    /// Reads and decodes a page straight from disk, bypassing the pool.
    pub fn read_page(&self, page_id: PageId) -> Result<HeapPage> {
        let mut data = vec![0u8; PAGE_SIZE];
        self.disk.read_page(page_id, &mut data)?;
        HeapPage::deserialize(&data, Arc::clone(&self.schema), page_id, self.id)
    }

    /// Encodes a page and writes it to disk, bypassing the pool.
    pub fn write_page(&self, page: &HeapPage) -> Result<()> {
        let bytes = page.serialize()?;
        self.disk.write_page(page.page_id(), &bytes)
    }

    /// Appends an empty page to the file.
    fn allocate_page(&self) -> Result<PageId> {
        // The on-disk image of an empty page does not depend on its number.
        let empty = HeapPage::new(Arc::clone(&self.schema), PageId::new(0), self.id)?;
        let page_id = self.disk.allocate_page(&empty.serialize()?)?;
        debug!(file = %self.id, page = %page_id, "extended heap file");
        Ok(page_id)
    }

    /// Inserts a tuple into the first page with a free slot, extending the
    /// file when every page is full.
    pub fn insert_tuple(&self, mut tuple: Tuple) -> Result<RecordId> {
        if **tuple.schema() != *self.schema {
            return Err(HeapError::SchemaMismatch(format!(
                "tuple {} does not belong to file {}",
                tuple, self.id
            )));
        }

        for n in 0..self.num_pages() {
            let attempt = self.pool.with_page(self, PageId::new(n), move |page| {
                if page.free_slot_count() == 0 {
                    Err(tuple)
                } else {
                    Ok(page.insert_tuple(tuple))
                }
            })?;
            match attempt {
                Ok(inserted) => return inserted,
                Err(rejected) => tuple = rejected,
            }
        }

        let page_id = self.allocate_page()?;
        self.pool
            .with_page(self, page_id, |page| page.insert_tuple(tuple))?
    }

    /// Deletes the tuple at `rid`.
    pub fn delete_tuple(&self, rid: RecordId) -> Result<Tuple> {
        self.pool
            .with_page(self, rid.page_id, |page| page.delete_tuple(rid))?
    }

    /// Returns a scan over every tuple, page by page in slot order.
    pub fn iter(&self) -> HeapFileIter<'_> {
        HeapFileIter {
            file: self,
            next_page: 0,
            buffered: Vec::new().into_iter(),
            failed: false,
        }
    }

    /// Loads delimited text rows into the file and flushes the pool.
    ///
    /// Integer columns accept integral or decimal text (decimals are
    /// truncated); string columns take the trimmed field verbatim. With
    /// `skip_last_field`, a trailing field on every line is ignored.
    /// Returns the number of rows inserted.
    pub fn load_from_csv<R: BufRead>(
        &self,
        reader: R,
        has_header: bool,
        separator: char,
        skip_last_field: bool,
    ) -> Result<usize> {
        let mut rows = 0;

        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = i + 1;
            if (has_header && i == 0) || line.trim().is_empty() {
                continue;
            }

            let mut fields: Vec<&str> = line.split(separator).collect();
            if skip_last_field {
                fields.pop();
            }
            if fields.len() != self.schema.column_count() {
                return Err(HeapError::Csv {
                    line: line_no,
                    message: format!(
                        "expected {} fields, found {}",
                        self.schema.column_count(),
                        fields.len()
                    ),
                });
            }

            let values = self
                .schema
                .columns()
                .zip(&fields)
                .map(|(col, raw)| parse_field(col.data_type(), raw, line_no))
                .collect::<Result<Vec<_>>>()?;
            let tuple = Tuple::new(Arc::clone(&self.schema), values)?;

            // An insert dirties at most one page, so it cannot run out of
            // evictable pages while one pool frame is clean or free.
            if self.pool.dirty_pages() >= self.pool.capacity() {
                self.pool.flush_all_pages()?;
            }
            self.insert_tuple(tuple)?;
            rows += 1;
        }

        self.pool.flush_all_pages()?;
        info!(file = %self.id, rows, "loaded csv");
        Ok(rows)
    }
}

fn parse_field(data_type: &DataType, raw: &str, line: usize) -> Result<Value> {
    let raw = raw.trim();
    match data_type {
        DataType::Int => raw
            .parse::<i64>()
            .ok()
            .or_else(|| {
                raw.parse::<f64>()
                    .ok()
                    .filter(|f| (i64::MIN as f64..i64::MAX as f64).contains(f))
                    .map(|f| f as i64)
            })
            .map(Value::Int)
            .ok_or_else(|| HeapError::Csv {
                line,
                message: format!("`{}` is not an integer", raw),
            }),
        DataType::Str(_) => Ok(Value::Str(raw.to_string())),
    }
}

/// Scan over a heap file, see [`HeapFile::iter`].
///
/// Tuples of one page are copied out of the pool before being yielded,
/// so the scan holds no lock between items.
pub struct HeapFileIter<'a> {
    file: &'a HeapFile,
    next_page: u32,
    buffered: std::vec::IntoIter<Tuple>,
    failed: bool,
}

impl Iterator for HeapFileIter<'_> {
    type Item = Result<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(tuple) = self.buffered.next() {
                return Some(Ok(tuple));
            }
            if self.failed || self.next_page >= self.file.num_pages() {
                return None;
            }

            let page_id = PageId::new(self.next_page);
            self.next_page += 1;
            let loaded = self.file.pool.with_page(self.file, page_id, |page| {
                page.iter().cloned().collect::<Vec<_>>()
            });
            match loaded {
                Ok(tuples) => self.buffered = tuples.into_iter(),
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
