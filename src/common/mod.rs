mod config;
mod error;
mod types;

pub use config::*;
pub use error::{HeapError, Result};
pub use types::{FileId, PageId, RecordId, SlotId};
