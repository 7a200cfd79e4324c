//! Heap page header.
//!
//! The header is the fixed 8-byte prefix of every heap page on disk.

use bytes::{Buf, BufMut};

use crate::common::{HeapError, Result, PAGE_HEADER_SIZE};

/// Heap page header (8 bytes).
///
/// Layout:
/// - total_slots: 4 bytes, little-endian i32 (slot capacity of the page)
/// - used_slots: 4 bytes, little-endian i32 (number of tuples stored)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageHeader {
    /// Slot capacity, fixed when the page is created.
    pub total_slots: u32,
    /// Number of occupied slots.
    pub used_slots: u32,
}

impl PageHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = PAGE_HEADER_SIZE;

    /// Creates a header for an empty page with `total_slots` capacity.
    pub fn new(total_slots: u32) -> Self {
        Self {
            total_slots,
            used_slots: 0,
        }
    }

    /// Returns the number of unoccupied slots.
    pub fn free_slots(&self) -> u32 {
        self.total_slots - self.used_slots
    }

    /// Returns true when every slot is occupied.
    pub fn is_full(&self) -> bool {
        self.used_slots >= self.total_slots
    }

    /// Serializes the header.
    pub fn write_to(&self, buf: &mut impl BufMut) -> Result<()> {
        if buf.remaining_mut() < Self::SIZE {
            return Err(HeapError::Encoding(format!(
                "Not enough room for header: {} < {}",
                buf.remaining_mut(),
                Self::SIZE
            )));
        }

        let total = i32::try_from(self.total_slots)
            .map_err(|_| HeapError::Encoding(format!("slot count {} overflows", self.total_slots)))?;
        let used = i32::try_from(self.used_slots)
            .map_err(|_| HeapError::Encoding(format!("slot count {} overflows", self.used_slots)))?;

        buf.put_i32_le(total);
        buf.put_i32_le(used);
        Ok(())
    }

    /// Deserializes a header, rejecting counts that break
    /// `0 <= used_slots <= total_slots`.
    pub fn read_from(buf: &mut impl Buf) -> Result<Self> {
        if buf.remaining() < Self::SIZE {
            return Err(HeapError::Decoding(format!(
                "Not enough bytes for header: {} < {}",
                buf.remaining(),
                Self::SIZE
            )));
        }

        let total = buf.get_i32_le();
        let used = buf.get_i32_le();

        if total < 0 || used < 0 {
            return Err(HeapError::Decoding(format!(
                "negative slot count in header ({}, {})",
                total, used
            )));
        }
        if used > total {
            return Err(HeapError::Decoding(format!(
                "header claims {} used slots of {}",
                used, total
            )));
        }

        Ok(Self {
            total_slots: total as u32,
            used_slots: used as u32,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let header = PageHeader {
            total_slots: 102,
            used_slots: 3,
        };

        let mut buf = Vec::new();
        header.write_to(&mut buf).unwrap();
        assert_eq!(buf, [102, 0, 0, 0, 3, 0, 0, 0]);

        let decoded = PageHeader::read_from(&mut &buf[..]).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(decoded.free_slots(), 99);
        assert!(!decoded.is_full());
    }

    #[test]
    fn test_header_rejects_bad_counts() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&2i32.to_le_bytes());
        buf.extend_from_slice(&3i32.to_le_bytes());
        assert!(matches!(
            PageHeader::read_from(&mut &buf[..]),
            Err(HeapError::Decoding(_))
        ));

        let mut buf = Vec::new();
        buf.extend_from_slice(&(-1i32).to_le_bytes());
        buf.extend_from_slice(&0i32.to_le_bytes());
        assert!(matches!(
            PageHeader::read_from(&mut &buf[..]),
            Err(HeapError::Decoding(_))
        ));
    }

    #[test]
    fn test_header_truncated() {
        let buf = [1u8, 0, 0];
        assert!(matches!(
            PageHeader::read_from(&mut &buf[..]),
            Err(HeapError::Decoding(_))
        ));

        let mut small = [0u8; 4];
        assert!(matches!(
            PageHeader::new(1).write_to(&mut &mut small[..]),
            Err(HeapError::Encoding(_))
        ));
    }

    #[test]
    fn test_header_full() {
        let mut header = PageHeader::new(2);
        assert_eq!(header.free_slots(), 2);
        header.used_slots = 2;
        assert!(header.is_full());
        assert!(PageHeader::new(0).is_full());
    }
}
