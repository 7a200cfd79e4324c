//! Heapstore - fixed-slot heap page storage for a record-oriented database
//!
//! Every tuple of a table has the same encoded width, so a page holds a
//! fixed number of slots computed from the schema. Pages are kept in memory
//! as slot arrays and written to disk as a compact, fixed-size block.
//!
//! # Architecture
//!
//! - **Tuple codec** (`tuple`): `Schema`, `Tuple` and `Value`, with a
//!   fixed-width binary encoding per field type
//!
//! - **Storage Layer** (`storage`)
//!   - `HeapPage`: slot allocation, iteration, and the on-disk page format
//!   - `DiskManager`: reads and writes PAGE_SIZE blocks of one file
//!   - `HeapFile`: a table as a sequence of heap pages, with CSV loading
//!
//! - **Buffer Pool** (`buffer`): caches decoded pages and never evicts a
//!   dirty one
//!
//! - **Query** (`query`): a sample aggregate over a loaded CSV file
//!
//! # Page format
//!
//! ```text
//! [0, 4)    total slots, LE i32
//! [4, 8)    used slots, LE i32
//! [8, ..)   occupied tuples in slot order, no gaps
//! ...       zero padding to PAGE_SIZE
//! ```
//!
//! Because empty slots are not stored, a page that is flushed and loaded
//! again has its tuples renumbered `0..used`. Record IDs are stable only
//! while a page stays in memory.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use heapstore::buffer::BufferPool;
//! use heapstore::storage::heap::HeapFile;
//! use heapstore::tuple::{DataType, Schema, TupleBuilder};
//!
//! let schema = Schema::builder()
//!     .column("name", DataType::string())
//!     .column("age", DataType::Int)
//!     .build_arc();
//! let pool = Arc::new(BufferPool::new(16));
//! let file = HeapFile::new("people.dat", schema.clone(), pool.clone()).unwrap();
//!
//! let tuple = TupleBuilder::new(schema).value("sam").value(25i64).build().unwrap();
//! let rid = file.insert_tuple(tuple).unwrap();
//! file.delete_tuple(rid).unwrap();
//!
//! pool.flush_all_pages().unwrap();
//! ```

pub mod buffer;
pub mod common;
pub mod query;
pub mod storage;
pub mod tuple;

// Identifiers and errors used by every layer
pub use common::{FileId, HeapError, PageId, RecordId, Result, SlotId};
