/// Size of a page in bytes (4 KB)
pub const PAGE_SIZE: usize = 4096;

/// Size of the heap page header: total slots + used slots, 4 bytes each
pub const PAGE_HEADER_SIZE: usize = 8;

/// Encoded width of an integer field (one 64-bit word)
pub const INT_FIELD_SIZE: usize = 8;

/// Default declared width of a string field in bytes
pub const STRING_LENGTH: usize = 32;

/// Default buffer pool size (number of resident pages)
pub const DEFAULT_BUFFER_POOL_SIZE: usize = 50;
