use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use tracing::trace;

use crate::common::{
    FileId, HeapError, PageId, RecordId, Result, SlotId, PAGE_HEADER_SIZE, PAGE_SIZE,
};
use crate::tuple::{Schema, Tuple};

use super::header::PageHeader;

/// Heap page layout on disk:
///
/// +------------------+
/// | total_slots      |  4 bytes, LE i32
/// | used_slots       |  4 bytes, LE i32
/// +------------------+
/// | tuple 0          |  record_width bytes each,
/// | tuple 1          |  occupied slots only, in
/// | ...              |  ascending slot order
/// +------------------+
/// | zero padding     |  up to PAGE_SIZE
/// +------------------+
///
/// Empty slots are not written. Reloading a page therefore renumbers its
/// tuples 0..used_slots in disk order: record IDs survive in-memory
/// inserts and deletes but not a flush-and-reload cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    Empty,
    Occupied(Tuple),
}

impl Slot {
    fn tuple(&self) -> Option<&Tuple> {
        match self {
            Slot::Occupied(tuple) => Some(tuple),
            Slot::Empty => None,
        }
    }
}

/// A page of fixed-width tuples held in memory.
///
/// The page owns a slot array whose length is fixed by the schema's record
/// width. It is not synchronized; the buffer pool serializes access.
#[derive(Debug, Clone)]
pub struct HeapPage {
    header: PageHeader,
    slots: Vec<Slot>,
    schema: Arc<Schema>,
    file_id: FileId,
    page_id: PageId,
    dirty: bool,
}

impl HeapPage {
    /// Returns how many tuples of `schema` fit on one page.
    pub fn slot_capacity(schema: &Schema) -> Result<usize> {
        let width = schema.record_width();
        if width == 0 {
            return Err(HeapError::SchemaMismatch(
                "schema has zero record width".to_string(),
            ));
        }
        Ok((PAGE_SIZE - PAGE_HEADER_SIZE) / width)
    }

    /// Creates an empty page for a file being extended.
    pub fn new(schema: Arc<Schema>, page_id: PageId, file_id: FileId) -> Result<Self> {
        let capacity = Self::slot_capacity(&schema)?;
        Ok(Self {
            header: PageHeader::new(capacity as u32),
            slots: vec![Slot::Empty; capacity],
            schema,
            file_id,
            page_id,
            dirty: false,
        })
    }

    /// Returns the page ID.
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Returns the file this page belongs to.
    pub fn file_id(&self) -> FileId {
        self.file_id
    }

    /// Returns the schema of the tuples on this page.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Returns the page header.
    pub fn header(&self) -> PageHeader {
        self.header
    }

    /// Returns the total number of slots.
    pub fn capacity(&self) -> usize {
        self.header.total_slots as usize
    }

    /// Returns the number of occupied slots.
    pub fn used_slots(&self) -> usize {
        self.header.used_slots as usize
    }

    /// Returns the number of empty slots.
    pub fn free_slot_count(&self) -> usize {
        self.header.free_slots() as usize
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    /// Inserts a tuple into the lowest-numbered empty slot.
    ///
    /// The tuple's record ID is set to its new slot and returned.
    pub fn insert_tuple(&mut self, mut tuple: Tuple) -> Result<RecordId> {
        if self.header.is_full() {
            return Err(HeapError::PageFull {
                page_id: self.page_id,
                capacity: self.capacity(),
            });
        }

        if **tuple.schema() != *self.schema {
            return Err(HeapError::SchemaMismatch(format!(
                "tuple {} does not belong to the schema of {}",
                tuple, self.page_id
            )));
        }

        let index = self
            .slots
            .iter()
            .position(|slot| matches!(slot, Slot::Empty))
            .ok_or(HeapError::PageFull {
                page_id: self.page_id,
                capacity: self.capacity(),
            })?;

        let rid = RecordId::new(self.page_id, SlotId::new(index as u32));
        tuple.set_rid(Some(rid));
        self.slots[index] = Slot::Occupied(tuple);
        self.header.used_slots += 1;
        self.dirty = true;

        trace!(page = %self.page_id, slot = index, "inserted tuple");
        Ok(rid)
    }

    /// Deletes the tuple at `rid`, returning it.
    ///
    /// Fails if the slot is out of range or already empty, or if `rid`
    /// names another page.
    pub fn delete_tuple(&mut self, rid: RecordId) -> Result<Tuple> {
        let invalid = HeapError::InvalidSlot {
            page_id: rid.page_id,
            slot_id: rid.slot_id,
        };
        if rid.page_id != self.page_id {
            return Err(invalid);
        }

        let index = rid.slot_id.as_usize();
        if index >= self.slots.len() {
            return Err(invalid);
        }

        let mut tuple = match std::mem::replace(&mut self.slots[index], Slot::Empty) {
            Slot::Occupied(tuple) => tuple,
            Slot::Empty => return Err(invalid),
        };
        debug_assert_eq!(tuple.rid(), Some(rid));
        tuple.set_rid(None);

        self.header.used_slots -= 1;
        self.dirty = true;

        trace!(page = %self.page_id, slot = rid.slot_id.0, "deleted tuple");
        Ok(tuple)
    }

    /// Gets the tuple in a slot, if the slot is occupied.
    pub fn get_tuple(&self, slot_id: SlotId) -> Option<&Tuple> {
        self.slots.get(slot_id.as_usize()).and_then(Slot::tuple)
    }

    /// Returns an iterator over the occupied slots in slot order.
    ///
    /// Each yielded tuple carries its record ID. The iterator borrows the
    /// page, so it cannot outlive a mutation; call `iter` again to rescan.
    pub fn iter(&self) -> HeapPageIter<'_> {
        HeapPageIter {
            slots: self.slots.iter(),
        }
    }

    /// Returns an iterator over the record IDs of occupied slots.
    pub fn record_ids(&self) -> impl Iterator<Item = RecordId> + '_ {
        self.iter().filter_map(Tuple::rid)
    }

    /// Encodes the page into a fresh PAGE_SIZE buffer.
    pub fn serialize(&self) -> Result<Bytes> {
        Ok(self.encode()?.freeze())
    }

    /// Encodes the page into `data`, which must be PAGE_SIZE bytes.
    ///
    /// `data` is only written once the whole page has been encoded.
    pub fn serialize_into(&self, data: &mut [u8]) -> Result<()> {
        if data.len() != PAGE_SIZE {
            return Err(HeapError::Encoding(format!(
                "buffer is {} bytes, page is {}",
                data.len(),
                PAGE_SIZE
            )));
        }
        let staged = self.encode()?;
        data.copy_from_slice(&staged);
        Ok(())
    }

    fn encode(&self) -> Result<BytesMut> {
        let mut staged = BytesMut::zeroed(PAGE_SIZE);
        {
            let mut cursor = &mut staged[..];
            self.header.write_to(&mut cursor)?;
            for tuple in self.iter() {
                tuple.write_to(&mut cursor)?;
            }
        }
        Ok(staged)
    }

    /// Rebuilds a page from its on-disk image.
    ///
    /// Tuple `k` in disk order lands in slot `k`; the remaining slots are
    /// empty. The loaded page is clean.
    pub fn deserialize(
        data: &[u8],
        schema: Arc<Schema>,
        page_id: PageId,
        file_id: FileId,
    ) -> Result<Self> {
        let mut cursor = data;
        let header = PageHeader::read_from(&mut cursor)?;

        let capacity = Self::slot_capacity(&schema)?;
        if header.total_slots as usize != capacity {
            return Err(HeapError::Decoding(format!(
                "{} has {} slots, schema allows {}",
                page_id, header.total_slots, capacity
            )));
        }

        let mut slots = vec![Slot::Empty; capacity];
        for (k, slot) in slots.iter_mut().take(header.used_slots as usize).enumerate() {
            let mut tuple = Tuple::read_from(Arc::clone(&schema), &mut cursor).map_err(|e| {
                match e {
                    HeapError::Decoding(msg) => {
                        HeapError::Decoding(format!("{} tuple {}: {}", page_id, k, msg))
                    }
                    other => other,
                }
            })?;
            tuple.set_rid(Some(RecordId::new(page_id, SlotId::new(k as u32))));
            *slot = Slot::Occupied(tuple);
        }

        Ok(Self {
            header,
            slots,
            schema,
            file_id,
            page_id,
            dirty: false,
        })
    }
}

impl<'a> IntoIterator for &'a HeapPage {
    type Item = &'a Tuple;
    type IntoIter = HeapPageIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the tuples of a heap page, see [`HeapPage::iter`].
pub struct HeapPageIter<'a> {
    slots: std::slice::Iter<'a, Slot>,
}

impl<'a> Iterator for HeapPageIter<'a> {
    type Item = &'a Tuple;

    fn next(&mut self) -> Option<Self::Item> {
        self.slots.find_map(Slot::tuple)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple::{DataType, Value};

    fn schema() -> Arc<Schema> {
        Schema::builder()
            .column("name", DataType::string())
            .column("age", DataType::Int)
            .build_arc()
    }

    fn tuple(schema: &Arc<Schema>, name: &str, age: i64) -> Tuple {
        Tuple::new(Arc::clone(schema), vec![Value::from(name), Value::Int(age)]).unwrap()
    }

    fn new_page(schema: &Arc<Schema>) -> HeapPage {
        HeapPage::new(Arc::clone(schema), PageId::new(4), FileId::new(0)).unwrap()
    }

    #[test]
    fn test_heap_page_init() {
        let schema = schema();
        let page = new_page(&schema);

        // (4096 - 8) / (32 + 8)
        assert_eq!(page.capacity(), 102);
        assert_eq!(page.free_slot_count(), 102);
        assert_eq!(page.used_slots(), 0);
        assert_eq!(page.page_id(), PageId::new(4));
        assert_eq!(page.file_id(), FileId::new(0));
        assert!(!page.is_dirty());
        assert_eq!(page.iter().count(), 0);
    }

    #[test]
    fn test_zero_width_schema_rejected() {
        let empty = Arc::new(Schema::new(Vec::<(String, DataType)>::new()));
        assert!(matches!(
            HeapPage::new(empty, PageId::new(0), FileId::new(0)),
            Err(HeapError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_heap_page_insert() {
        let schema = schema();
        let mut page = new_page(&schema);

        let rid = page.insert_tuple(tuple(&schema, "sam", 25)).unwrap();

        assert_eq!(rid, RecordId::new(PageId::new(4), SlotId::new(0)));
        assert_eq!(page.free_slot_count(), 101);
        assert!(page.is_dirty());

        let stored = page.get_tuple(SlotId::new(0)).unwrap();
        assert_eq!(stored, &tuple(&schema, "sam", 25));
        assert_eq!(stored.rid(), Some(rid));
    }

    #[test]
    fn test_heap_page_first_fit() {
        let schema = schema();
        let mut page = new_page(&schema);

        page.insert_tuple(tuple(&schema, "a", 1)).unwrap();
        let middle = page.insert_tuple(tuple(&schema, "b", 2)).unwrap();
        page.insert_tuple(tuple(&schema, "c", 3)).unwrap();

        page.delete_tuple(middle).unwrap();
        let rid = page.insert_tuple(tuple(&schema, "d", 4)).unwrap();
        assert_eq!(rid.slot_id, SlotId::new(1));
    }

    #[test]
    fn test_heap_page_delete() {
        let schema = schema();
        let mut page = new_page(&schema);

        let rid = page.insert_tuple(tuple(&schema, "sam", 25)).unwrap();
        page.set_dirty(false);

        let removed = page.delete_tuple(rid).unwrap();
        assert_eq!(removed, tuple(&schema, "sam", 25));
        assert_eq!(removed.rid(), None);
        assert_eq!(page.free_slot_count(), 102);
        assert!(page.is_dirty());
        assert!(page.get_tuple(rid.slot_id).is_none());
    }

    #[test]
    fn test_heap_page_invalid_delete() {
        let schema = schema();
        let mut page = new_page(&schema);
        let rid = page.insert_tuple(tuple(&schema, "sam", 25)).unwrap();
        page.delete_tuple(rid).unwrap();

        // Already empty
        assert!(matches!(
            page.delete_tuple(rid),
            Err(HeapError::InvalidSlot { .. })
        ));
        // Out of range
        let far = RecordId::new(PageId::new(4), SlotId::new(102));
        assert!(matches!(
            page.delete_tuple(far),
            Err(HeapError::InvalidSlot { .. })
        ));
        // Other page
        page.insert_tuple(tuple(&schema, "sam", 25)).unwrap();
        let other = RecordId::new(PageId::new(5), SlotId::new(0));
        assert!(matches!(
            page.delete_tuple(other),
            Err(HeapError::InvalidSlot { .. })
        ));
        assert_eq!(page.used_slots(), 1);
    }

    #[test]
    fn test_heap_page_full() {
        let schema = schema();
        let mut page = new_page(&schema);

        for i in 0..page.capacity() {
            page.insert_tuple(tuple(&schema, "x", i as i64)).unwrap();
        }
        assert_eq!(page.free_slot_count(), 0);

        let before: Vec<Tuple> = page.iter().cloned().collect();
        let err = page.insert_tuple(tuple(&schema, "y", 0)).unwrap_err();
        assert!(matches!(err, HeapError::PageFull { capacity: 102, .. }));
        assert!(err.is_recoverable());

        let after: Vec<Tuple> = page.iter().cloned().collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_heap_page_schema_mismatch() {
        let schema = schema();
        let mut page = new_page(&schema);

        let other = Schema::builder().column("id", DataType::Int).build_arc();
        let t = Tuple::new(other, vec![Value::Int(1)]).unwrap();
        assert!(matches!(
            page.insert_tuple(t),
            Err(HeapError::SchemaMismatch(_))
        ));
        assert_eq!(page.used_slots(), 0);
        assert!(!page.is_dirty());
    }

    #[test]
    fn test_heap_page_iter_order() {
        let schema = schema();
        let mut page = new_page(&schema);

        let rids: Vec<RecordId> = (0..5)
            .map(|i| page.insert_tuple(tuple(&schema, "t", i)).unwrap())
            .collect();
        page.delete_tuple(rids[0]).unwrap();
        page.delete_tuple(rids[3]).unwrap();

        let ages: Vec<i64> = page
            .iter()
            .map(|t| t.value(1).and_then(Value::as_int).unwrap())
            .collect();
        assert_eq!(ages, vec![1, 2, 4]);

        let slots: Vec<u32> = page.record_ids().map(|r| r.slot_id.0).collect();
        assert_eq!(slots, vec![1, 2, 4]);

        // A fresh iterator starts over
        assert_eq!(page.iter().count(), 3);
        assert_eq!((&page).into_iter().count(), 3);
    }

    #[test]
    fn test_heap_page_serialize_layout() {
        let schema = schema();
        let mut page = new_page(&schema);

        let a = tuple(&schema, "a", 1);
        let b = tuple(&schema, "b", 2);
        page.insert_tuple(a.clone()).unwrap();
        let gap = page.insert_tuple(tuple(&schema, "gap", 0)).unwrap();
        page.insert_tuple(b.clone()).unwrap();
        page.delete_tuple(gap).unwrap();

        let bytes = page.serialize().unwrap();
        assert_eq!(bytes.len(), PAGE_SIZE);
        assert_eq!(&bytes[0..4], &102i32.to_le_bytes());
        assert_eq!(&bytes[4..8], &2i32.to_le_bytes());
        assert_eq!(&bytes[8..48], a.to_bytes().unwrap().as_slice());
        assert_eq!(&bytes[48..88], b.to_bytes().unwrap().as_slice());
        assert!(bytes[88..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_heap_page_reload_renumbers() {
        let schema = schema();
        let mut page = new_page(&schema);

        page.insert_tuple(tuple(&schema, "a", 1)).unwrap();
        let gap = page.insert_tuple(tuple(&schema, "gap", 0)).unwrap();
        page.insert_tuple(tuple(&schema, "b", 2)).unwrap();
        page.delete_tuple(gap).unwrap();

        let bytes = page.serialize().unwrap();
        let loaded =
            HeapPage::deserialize(&bytes, Arc::clone(&schema), PageId::new(4), FileId::new(0))
                .unwrap();

        assert!(!loaded.is_dirty());
        assert_eq!(loaded.capacity(), 102);
        assert_eq!(loaded.used_slots(), 2);
        assert_eq!(loaded.get_tuple(SlotId::new(0)), Some(&tuple(&schema, "a", 1)));
        assert_eq!(loaded.get_tuple(SlotId::new(1)), Some(&tuple(&schema, "b", 2)));
        assert_eq!(loaded.get_tuple(SlotId::new(2)), None);

        let slots: Vec<u32> = loaded.record_ids().map(|r| r.slot_id.0).collect();
        assert_eq!(slots, vec![0, 1]);
    }

    #[test]
    fn test_serialize_into_checks_length() {
        let schema = schema();
        let page = new_page(&schema);

        let mut short = vec![0u8; PAGE_SIZE - 1];
        assert!(matches!(
            page.serialize_into(&mut short),
            Err(HeapError::Encoding(_))
        ));

        let mut data = vec![0xFFu8; PAGE_SIZE];
        page.serialize_into(&mut data).unwrap();
        assert_eq!(&data[0..8], &[102, 0, 0, 0, 0, 0, 0, 0]);
        assert!(data[8..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_deserialize_truncated() {
        let schema = schema();
        let mut page = new_page(&schema);
        page.insert_tuple(tuple(&schema, "a", 1)).unwrap();
        page.insert_tuple(tuple(&schema, "b", 2)).unwrap();
        let bytes = page.serialize().unwrap();

        let err = HeapPage::deserialize(
            &bytes[..60],
            Arc::clone(&schema),
            PageId::new(4),
            FileId::new(0),
        )
        .unwrap_err();
        assert!(matches!(err, HeapError::Decoding(_)));

        let err = HeapPage::deserialize(&bytes[..5], schema, PageId::new(4), FileId::new(0))
            .unwrap_err();
        assert!(matches!(err, HeapError::Decoding(_)));
    }

    #[test]
    fn test_deserialize_wrong_schema() {
        let schema = schema();
        let page = new_page(&schema);
        let bytes = page.serialize().unwrap();

        let narrow = Schema::builder().column("id", DataType::Int).build_arc();
        let err =
            HeapPage::deserialize(&bytes, narrow, PageId::new(4), FileId::new(0)).unwrap_err();
        assert!(matches!(err, HeapError::Decoding(_)));
    }
}
