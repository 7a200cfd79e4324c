mod header;
mod heap_page;

pub use header::PageHeader;
pub use heap_page::{HeapPage, HeapPageIter};
