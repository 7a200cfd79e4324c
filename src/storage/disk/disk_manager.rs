use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;
use tracing::debug;

use crate::common::{HeapError, PageId, Result, PAGE_SIZE};

/// DiskManager reads and writes fixed-size page blocks of one heap file.
/// Page `n` lives at byte offset `n * PAGE_SIZE`.
#[derive(Debug)]
pub struct DiskManager {
    file: Mutex<File>,
    path: PathBuf,
    /// Pages covered by the file length
    num_pages: AtomicU32,
    num_reads: AtomicU32,
    num_writes: AtomicU32,
}

impl DiskManager {
    /// Opens the file at `path`, creating it if it doesn't exist.
    ///
    /// A trailing partial block is ignored.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let num_pages = (file.metadata()?.len() / PAGE_SIZE as u64) as u32;
        debug!(path = %path.display(), num_pages, "opened heap file");

        Ok(Self {
            file: Mutex::new(file),
            path,
            num_pages: AtomicU32::new(num_pages),
            num_reads: AtomicU32::new(0),
            num_writes: AtomicU32::new(0),
        })
    }

    /// Reads a page into `data`, which must be PAGE_SIZE bytes.
    ///
    /// Pages past the end of the file are reported as `PageNotFound`.
    pub fn read_page(&self, page_id: PageId, data: &mut [u8]) -> Result<()> {
        check_len(data.len())?;
        if page_id.as_u32() >= self.num_pages() {
            return Err(HeapError::PageNotFound(page_id));
        }

        {
            let mut file = self.file.lock();
            file.seek(SeekFrom::Start(block_offset(page_id)))?;
            file.read_exact(data)?;
        }

        self.num_reads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Writes `data`, which must be PAGE_SIZE bytes, as page `page_id`.
    /// Writing past the end grows the file.
    pub fn write_page(&self, page_id: PageId, data: &[u8]) -> Result<()> {
        check_len(data.len())?;
        let mut file = self.file.lock();
        self.write_block(&mut file, page_id, data)
    }

    /// Appends `data` as a new page and returns its page ID.
    pub fn allocate_page(&self, data: &[u8]) -> Result<PageId> {
        check_len(data.len())?;

        // The page count is read under the file lock so two appends never
        // pick the same block.
        let mut file = self.file.lock();
        let page_id = PageId::new(self.num_pages());
        self.write_block(&mut file, page_id, data)?;

        debug!(page = %page_id, path = %self.path.display(), "allocated page");
        Ok(page_id)
    }

    fn write_block(&self, file: &mut File, page_id: PageId, data: &[u8]) -> Result<()> {
        file.seek(SeekFrom::Start(block_offset(page_id)))?;
        file.write_all(data)?;
        file.flush()?;

        self.num_pages.fetch_max(page_id.as_u32() + 1, Ordering::SeqCst);
        self.num_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn num_pages(&self) -> u32 {
        self.num_pages.load(Ordering::SeqCst)
    }

    pub fn num_reads(&self) -> u32 {
        self.num_reads.load(Ordering::Relaxed)
    }

    pub fn num_writes(&self) -> u32 {
        self.num_writes.load(Ordering::Relaxed)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Forces written pages to stable storage.
    pub fn sync(&self) -> Result<()> {
        self.file.lock().sync_all()?;
        Ok(())
    }
}

impl Drop for DiskManager {
    fn drop(&mut self) {
        let _ = self.file.get_mut().sync_all();
    }
}

fn block_offset(page_id: PageId) -> u64 {
    page_id.as_u32() as u64 * PAGE_SIZE as u64
}

fn check_len(len: usize) -> Result<()> {
    if len != PAGE_SIZE {
        return Err(HeapError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("page buffer is {} bytes, expected {}", len, PAGE_SIZE),
        )));
    }
    Ok(())
}
