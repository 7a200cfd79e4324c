use std::fmt;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            pub fn new(id: u32) -> Self {
                Self(id)
            }

            pub fn as_u32(&self) -> u32 {
                self.0
            }

            pub fn as_usize(&self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }
    };
}

id_type!(
    /// Page number within its heap file
    PageId
);

id_type!(
    /// Index into a heap page's slot array
    SlotId
);

id_type!(
    /// Index into the buffer pool's file table.
    ///
    /// Pages refer to their owning heap file through this handle; holding a
    /// `FileId` does not keep the file open.
    FileId
);

/// Location of a tuple: page number plus slot index.
///
/// A record ID is only meaningful while its page stays resident: flushing
/// compacts the page, and reloading renumbers tuples by their position on
/// disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId {
    pub page_id: PageId,
    pub slot_id: SlotId,
}

impl RecordId {
    pub fn new(page_id: PageId, slot_id: SlotId) -> Self {
        Self { page_id, slot_id }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.page_id.0, self.slot_id.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(PageId::new(3).to_string(), "PageId(3)");
        assert_eq!(FileId::new(0).to_string(), "FileId(0)");
        assert_eq!(
            RecordId::new(PageId::new(2), SlotId::new(9)).to_string(),
            "(2, 9)"
        );
    }

    #[test]
    fn test_record_ids_order_by_page_then_slot() {
        let a = RecordId::new(PageId::new(0), SlotId::new(5));
        let b = RecordId::new(PageId::new(1), SlotId::new(0));
        assert!(a < b);
    }
}
