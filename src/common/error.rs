use thiserror::Error;

use super::types::{FileId, PageId, SlotId};

/// Storage error types
#[derive(Error, Debug)]
pub enum HeapError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{page_id} is full ({capacity} slots)")]
    PageFull { page_id: PageId, capacity: usize },

    #[error("Invalid slot {slot_id} on {page_id}")]
    InvalidSlot { page_id: PageId, slot_id: SlotId },

    #[error("Failed to encode page: {0}")]
    Encoding(String),

    #[error("Failed to decode page: {0}")]
    Decoding(String),

    #[error("Buffer pool is full, every resident page is dirty")]
    BufferPoolFull,

    #[error("Page {0} not found")]
    PageNotFound(PageId),

    #[error("File {0} is not registered with the buffer pool")]
    UnknownFile(FileId),

    #[error("Tuple does not match schema: {0}")]
    SchemaMismatch(String),

    #[error("Field {0} not found")]
    FieldNotFound(String),

    #[error("CSV error on line {line}: {message}")]
    Csv { line: usize, message: String },
}

impl HeapError {
    /// Returns true for errors the caller can recover from by allocating
    /// a new page or flushing before retrying.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, HeapError::PageFull { .. } | HeapError::BufferPoolFull)
    }
}

pub type Result<T> = std::result::Result<T, HeapError>;
