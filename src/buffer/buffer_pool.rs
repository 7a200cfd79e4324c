use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::common::{FileId, HeapError, PageId, Result};
use crate::storage::disk::DiskManager;
use crate::storage::heap::HeapFile;
use crate::storage::page::HeapPage;

type PageKey = (FileId, PageId);

/// Resident pages plus their recency order
#[derive(Debug)]
struct PoolState {
    /// Decoded pages keyed by owning file and page number
    pages: HashMap<PageKey, HeapPage>,
    /// Least recently used at the front
    lru: VecDeque<PageKey>,
}

impl PoolState {
    fn touch(&mut self, key: PageKey) {
        if let Some(pos) = self.lru.iter().position(|k| *k == key) {
            self.lru.remove(pos);
        }
        self.lru.push_back(key);
    }

    /// Drops the least recently used clean page.
    fn evict_one(&mut self) -> Result<PageKey> {
        let pos = self
            .lru
            .iter()
            .position(|key| self.pages.get(key).is_some_and(|p| !p.is_dirty()));

        match pos {
            Some(pos) => {
                let key = self.lru.remove(pos).ok_or(HeapError::BufferPoolFull)?;
                self.pages.remove(&key);
                debug!(file = %key.0, page = %key.1, "evicted page");
                Ok(key)
            }
            None => {
                warn!(resident = self.pages.len(), "no clean page to evict");
                Err(HeapError::BufferPoolFull)
            }
        }
    }
}

/// BufferPool caches decoded heap pages for any number of heap files.
///
/// Dirty pages are never evicted: they stay resident until flushed with
/// `flush_page` or `flush_all_pages`. When every resident page is dirty,
/// loading another page fails with `BufferPoolFull`.
#[derive(Debug)]
pub struct BufferPool {
    /// Maximum number of resident pages
    num_pages: usize,
    /// Resident pages
    state: Mutex<PoolState>,
    /// File table: routes flushes to the disk manager of a page's file
    files: Mutex<HashMap<FileId, Arc<DiskManager>>>,
    /// Next file ID to hand out
    next_file_id: AtomicU32,
}

impl BufferPool {
    /// Creates a buffer pool holding at most `num_pages` pages.
    pub fn new(num_pages: usize) -> Self {
        Self {
            num_pages,
            state: Mutex::new(PoolState {
                pages: HashMap::with_capacity(num_pages),
                lru: VecDeque::with_capacity(num_pages),
            }),
            files: Mutex::new(HashMap::new()),
            next_file_id: AtomicU32::new(0),
        }
    }

    /// Returns the maximum number of resident pages.
    pub fn capacity(&self) -> usize {
        self.num_pages
    }

    /// Adds a file to the file table and returns its ID.
    pub fn register_file(&self, disk: Arc<DiskManager>) -> FileId {
        let file_id = FileId::new(self.next_file_id.fetch_add(1, Ordering::SeqCst));
        debug!(file = %file_id, path = %disk.path().display(), "registered file");
        self.files.lock().insert(file_id, disk);
        file_id
    }

    /// Runs `f` against page `page_id` of `file`, loading it if needed.
    ///
    /// The pool lock is held while `f` runs, so `f` has exclusive access
    /// to the page and must not call back into the pool.
    pub fn with_page<R>(
        &self,
        file: &HeapFile,
        page_id: PageId,
        f: impl FnOnce(&mut HeapPage) -> R,
    ) -> Result<R> {
        let key = (file.id(), page_id);
        let mut state = self.state.lock();

        if !state.pages.contains_key(&key) {
            if state.pages.len() >= self.num_pages {
                state.evict_one()?;
            }
            let page = file.read_page(page_id)?;
            debug!(file = %key.0, page = %page_id, "loaded page");
            state.pages.insert(key, page);
        }
        state.touch(key);

        let page = state
            .pages
            .get_mut(&key)
            .ok_or(HeapError::PageNotFound(page_id))?;
        Ok(f(page))
    }

    /// Writes a resident page back to its file if it is dirty.
    /// Returns false if the page is not resident.
    pub fn flush_page(&self, file_id: FileId, page_id: PageId) -> Result<bool> {
        let mut state = self.state.lock();
        match state.pages.get_mut(&(file_id, page_id)) {
            Some(page) => {
                self.write_back(page)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Writes every dirty page back to its file.
    pub fn flush_all_pages(&self) -> Result<usize> {
        let mut state = self.state.lock();
        let mut flushed = 0;
        for page in state.pages.values_mut().filter(|p| p.is_dirty()) {
            self.write_back(page)?;
            flushed += 1;
        }
        info!(flushed, "flushed buffer pool");
        Ok(flushed)
    }

    fn write_back(&self, page: &mut HeapPage) -> Result<()> {
        if !page.is_dirty() {
            return Ok(());
        }

        let disk = self
            .files
            .lock()
            .get(&page.file_id())
            .cloned()
            .ok_or(HeapError::UnknownFile(page.file_id()))?;

        let bytes = page.serialize()?;
        disk.write_page(page.page_id(), &bytes)?;
        page.set_dirty(false);
        Ok(())
    }

    /// Drops every clean page, returning how many were dropped.
    pub fn evict_clean_pages(&self) -> usize {
        let mut state = self.state.lock();
        let before = state.pages.len();
        state.pages.retain(|_, page| page.is_dirty());
        let PoolState { pages, lru } = &mut *state;
        lru.retain(|key| pages.contains_key(key));
        before - pages.len()
    }

    /// Returns the number of resident pages.
    pub fn resident_pages(&self) -> usize {
        self.state.lock().pages.len()
    }

    /// Returns the number of resident dirty pages.
    pub fn dirty_pages(&self) -> usize {
        self.state
            .lock()
            .pages
            .values()
            .filter(|p| p.is_dirty())
            .count()
    }

    /// Returns true if the page is resident.
    pub fn is_resident(&self, file_id: FileId, page_id: PageId) -> bool {
        self.state.lock().pages.contains_key(&(file_id, page_id))
    }
}
