//! The column vector decoders write into.

use crate::{
    presence::Presence,
    types::{ColumnType, ListEntry, StructField, ValueRef},
    values::Values,
};

/// A caller-owned columnar destination: a typed value buffer, a validity
/// store, and an optional auxiliary store for variable-length or nested
/// payloads.
///
/// The vector's length is fixed at construction; decoders write values and
/// validity into positions handed to them and never resize the vector
/// itself. The one growth path is the auxiliary side: variable-length values
/// append bytes to the heap, and list entries reserve ranges in the child
/// vector via [`ColumnVector::add_list_entry`]. When a slot is null its data
/// bytes are unspecified and must not be read back.
#[derive(Debug, Clone)]
pub struct ColumnVector {
    column_type: ColumnType,
    len: usize,
    values: Values,
    presence: Presence,
    aux: Option<Box<AuxStore>>,
}

#[derive(Debug, Clone)]
enum AuxStore {
    /// Byte heap for `String`, `Blob` and `FixedSizeBlob` payloads.
    Heap(Values),
    /// Growable child vector for `List` elements.
    List(ColumnVector),
    /// One child vector per struct field, same length as the parent.
    Struct(Vec<ColumnVector>),
}

impl ColumnVector {
    /// Creates a vector of `len` valid, zeroed slots of the given type.
    pub fn new(column_type: ColumnType, len: usize) -> ColumnVector {
        let values = match column_type.fixed_width() {
            Some(width) => Values::zeroed_bytes(len * width),
            None => Values::new(),
        };
        let aux = match &column_type {
            ColumnType::String | ColumnType::Blob | ColumnType::FixedSizeBlob(_) => {
                Some(Box::new(AuxStore::Heap(Values::new())))
            }
            ColumnType::List(inner) => Some(Box::new(AuxStore::List(ColumnVector::new(
                inner.as_ref().clone(),
                0,
            )))),
            ColumnType::Struct(fields) | ColumnType::Union(fields) => {
                Some(Box::new(AuxStore::Struct(
                    fields
                        .iter()
                        .map(|f| ColumnVector::new(f.column_type.clone(), len))
                        .collect(),
                )))
            }
            _ => None,
        };
        ColumnVector {
            column_type,
            len,
            values,
            presence: Presence::Trivial(len),
            aux,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn column_type(&self) -> &ColumnType {
        &self.column_type
    }

    #[inline]
    pub fn presence(&self) -> &Presence {
        &self.presence
    }

    #[inline]
    pub fn presence_mut(&mut self) -> &mut Presence {
        &mut self.presence
    }

    #[inline]
    pub fn values(&self) -> &Values {
        &self.values
    }

    #[inline]
    pub fn is_null(&self, index: usize) -> bool {
        self.presence.is_null(index)
    }

    #[inline]
    pub fn set_null(&mut self, index: usize) {
        assert!(index < self.len);
        self.presence.set_null(index);
    }

    #[inline]
    pub fn set_valid(&mut self, index: usize) {
        assert!(index < self.len);
        self.presence.set_valid(index);
    }

    /// Marks every slot null.
    pub fn set_all_null(&mut self) {
        self.presence = Presence::Nulls(self.len);
    }

    /// Writes a fixed-width value at `index` and marks the slot valid.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds or `size_of::<T>()` does not match
    /// the column's slot width.
    #[inline]
    pub fn set_value<T>(&mut self, index: usize, value: T)
    where
        T: bytemuck::NoUninit,
    {
        assert_eq!(self.column_type.fixed_width(), Some(size_of::<T>()));
        assert!(index < self.len);
        let start = index * size_of::<T>();
        self.values.as_bytes_mut()[start..start + size_of::<T>()]
            .copy_from_slice(bytemuck::bytes_of(&value));
        self.presence.set_valid(index);
    }

    /// Reads back the fixed-width value at `index`.
    #[inline]
    pub fn value<T>(&self, index: usize) -> T
    where
        T: bytemuck::AnyBitPattern,
    {
        assert_eq!(self.column_type.fixed_width(), Some(size_of::<T>()));
        let start = index * size_of::<T>();
        bytemuck::pod_read_unaligned(&self.values.as_bytes()[start..start + size_of::<T>()])
    }

    /// Appends `bytes` to the auxiliary heap and points slot `index` at them,
    /// marking the slot valid.
    pub fn set_binary(&mut self, index: usize, bytes: &[u8]) {
        assert!(self.column_type.is_var_len());
        if let ColumnType::FixedSizeBlob(size) = self.column_type {
            assert_eq!(size, bytes.len());
        }
        assert!(index < self.len);
        let heap = self.heap_mut();
        let offset = heap.bytes_len() as u64;
        heap.extend_from_byte_slice(bytes);
        let value_ref = ValueRef {
            offset,
            len: bytes.len() as u64,
        };
        let start = index * size_of::<ValueRef>();
        self.values.as_bytes_mut()[start..start + size_of::<ValueRef>()]
            .copy_from_slice(bytemuck::bytes_of(&value_ref));
        self.presence.set_valid(index);
    }

    /// Appends a string value; see [`ColumnVector::set_binary`].
    pub fn set_str(&mut self, index: usize, value: &str) {
        assert!(matches!(
            self.column_type,
            ColumnType::String | ColumnType::Blob
        ));
        self.set_binary(index, value.as_bytes());
    }

    /// Returns the variable-length payload of slot `index`.
    pub fn binary_at(&self, index: usize) -> &[u8] {
        let start = index * size_of::<ValueRef>();
        let value_ref: ValueRef =
            bytemuck::pod_read_unaligned(&self.values.as_bytes()[start..start + 16]);
        let heap = self.heap();
        &heap.as_bytes()[value_ref.offset as usize..(value_ref.offset + value_ref.len) as usize]
    }

    /// Returns the string payload of slot `index`.
    pub fn str_at(&self, index: usize) -> &str {
        std::str::from_utf8(self.binary_at(index)).expect("string slot holds validated UTF-8")
    }

    /// Reserves `count` elements in the list child vector and records the
    /// entry at slot `index`, returning the child offset of the new range.
    ///
    /// Validity of the slot is left untouched: callers record the entry even
    /// for null lists so that downstream offset arithmetic stays consistent.
    pub fn add_list_entry(&mut self, index: usize, count: u64) -> u64 {
        assert!(index < self.len);
        let child = match self.aux.as_deref_mut() {
            Some(AuxStore::List(child)) => child,
            _ => panic!("add_list_entry on a non-list vector"),
        };
        let offset = child.len() as u64;
        child.grow_by(count as usize);
        let entry = ListEntry { offset, len: count };
        let start = index * size_of::<ListEntry>();
        self.values.as_bytes_mut()[start..start + size_of::<ListEntry>()]
            .copy_from_slice(bytemuck::bytes_of(&entry));
        offset
    }

    /// Returns the list entry recorded at slot `index`.
    pub fn list_entry(&self, index: usize) -> ListEntry {
        assert!(matches!(self.column_type, ColumnType::List(_)));
        let start = index * size_of::<ListEntry>();
        bytemuck::pod_read_unaligned(&self.values.as_bytes()[start..start + 16])
    }

    /// Returns the list child vector.
    pub fn child(&self) -> &ColumnVector {
        match self.aux.as_deref() {
            Some(AuxStore::List(child)) => child,
            _ => panic!("child on a non-list vector"),
        }
    }

    /// Returns the list child vector mutably.
    pub fn child_mut(&mut self) -> &mut ColumnVector {
        match self.aux.as_deref_mut() {
            Some(AuxStore::List(child)) => child,
            _ => panic!("child_mut on a non-list vector"),
        }
    }

    /// Returns the struct field vectors.
    pub fn struct_children(&self) -> &[ColumnVector] {
        match self.aux.as_deref() {
            Some(AuxStore::Struct(children)) => children,
            _ => panic!("struct_children on a non-struct vector"),
        }
    }

    /// Returns the struct field vector at `field`.
    pub fn struct_child(&self, field: usize) -> &ColumnVector {
        &self.struct_children()[field]
    }

    /// Returns the struct field vector at `field` mutably.
    pub fn struct_child_mut(&mut self, field: usize) -> &mut ColumnVector {
        match self.aux.as_deref_mut() {
            Some(AuxStore::Struct(children)) => &mut children[field],
            _ => panic!("struct_child_mut on a non-struct vector"),
        }
    }

    /// Returns the declared struct or union member fields.
    pub fn struct_fields(&self) -> &[StructField] {
        match &self.column_type {
            ColumnType::Struct(fields) | ColumnType::Union(fields) => fields,
            _ => panic!("struct_fields on a non-struct vector"),
        }
    }

    /// Extends the vector by `count` valid, zeroed slots.
    ///
    /// This is only meaningful for list children and scratch vectors; the
    /// top-level batch vector owned by the scan operator is never grown by
    /// decoders.
    pub fn grow_by(&mut self, count: usize) {
        if let Some(width) = self.column_type.fixed_width() {
            self.values.resize_zeroed_bytes((self.len + count) * width);
        }
        if let Some(AuxStore::Struct(children)) = self.aux.as_deref_mut() {
            for child in children {
                child.grow_by(count);
            }
        }
        self.presence.extend_valid(count);
        self.len += count;
    }

    /// Copies one logical value (including validity and any nested payload)
    /// from `src[src_index]` into `self[dst_index]`.
    pub fn copy_value_from(&mut self, dst_index: usize, src: &ColumnVector, src_index: usize) {
        if src.is_null(src_index) {
            self.set_null(dst_index);
            return;
        }
        match &self.column_type {
            ColumnType::String | ColumnType::Blob | ColumnType::FixedSizeBlob(_) => {
                self.set_binary(dst_index, src.binary_at(src_index));
            }
            ColumnType::List(_) => {
                let entry = src.list_entry(src_index);
                let offset = self.add_list_entry(dst_index, entry.len);
                for i in 0..entry.len {
                    self.child_mut().copy_value_from(
                        (offset + i) as usize,
                        src.child(),
                        (entry.offset + i) as usize,
                    );
                }
                self.set_valid(dst_index);
            }
            ColumnType::Struct(fields) => {
                for field in 0..fields.len() {
                    self.struct_child_mut(field).copy_value_from(
                        dst_index,
                        src.struct_child(field),
                        src_index,
                    );
                }
                self.set_valid(dst_index);
            }
            ColumnType::Union(fields) => {
                let tag = src.value::<u8>(src_index);
                for field in 0..fields.len() {
                    self.struct_child_mut(field).copy_value_from(
                        dst_index,
                        src.struct_child(field),
                        src_index,
                    );
                }
                self.set_value(dst_index, tag);
            }
            _ => {
                let width = self.column_type.fixed_width().unwrap();
                let dst_start = dst_index * width;
                let src_start = src_index * width;
                self.values.as_bytes_mut()[dst_start..dst_start + width]
                    .copy_from_slice(&src.values.as_bytes()[src_start..src_start + width]);
                self.set_valid(dst_index);
            }
        }
    }

    fn heap(&self) -> &Values {
        match self.aux.as_deref() {
            Some(AuxStore::Heap(heap)) => heap,
            _ => panic!("heap access on a fixed-width vector"),
        }
    }

    fn heap_mut(&mut self) -> &mut Values {
        match self.aux.as_deref_mut() {
            Some(AuxStore::Heap(heap)) => heap,
            _ => panic!("heap access on a fixed-width vector"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Interval;

    #[test]
    fn test_fixed_width_round_trip() {
        let mut v = ColumnVector::new(ColumnType::Int64, 4);
        v.set_value(0, 10i64);
        v.set_value(3, -5i64);
        v.set_null(1);
        assert_eq!(v.value::<i64>(0), 10);
        assert_eq!(v.value::<i64>(3), -5);
        assert!(v.is_null(1));
        assert!(!v.is_null(0));
    }

    #[test]
    fn test_interval_slot() {
        let mut v = ColumnVector::new(ColumnType::Interval, 2);
        v.set_value(1, Interval::new(3, 10, 250_000));
        assert_eq!(v.value::<Interval>(1), Interval::new(3, 10, 250_000));
    }

    #[test]
    fn test_string_heap() {
        let mut v = ColumnVector::new(ColumnType::String, 3);
        v.set_str(0, "alpha");
        v.set_str(2, "b");
        v.set_null(1);
        assert_eq!(v.str_at(0), "alpha");
        assert_eq!(v.str_at(2), "b");
        // Out-of-order writes land at distinct heap ranges.
        v.set_str(1, "middle");
        assert_eq!(v.str_at(1), "middle");
        assert_eq!(v.str_at(0), "alpha");
    }

    #[test]
    fn test_list_child_growth() {
        let mut v = ColumnVector::new(ColumnType::List(Box::new(ColumnType::Int32)), 2);
        let base = v.add_list_entry(0, 3);
        assert_eq!(base, 0);
        for i in 0..3 {
            v.child_mut().set_value(i, (i as i32) * 2);
        }
        let base = v.add_list_entry(1, 2);
        assert_eq!(base, 3);
        v.child_mut().set_value(3, 100i32);
        v.child_mut().set_value(4, 200i32);

        let entry = v.list_entry(1);
        assert_eq!((entry.offset, entry.len), (3, 2));
        assert_eq!(v.child().value::<i32>(4), 200);
    }

    #[test]
    fn test_struct_children_track_parent_len() {
        let fields = vec![
            StructField::new("a", ColumnType::Int32),
            StructField::new("b", ColumnType::String),
        ];
        let mut v = ColumnVector::new(ColumnType::Struct(fields), 2);
        v.struct_child_mut(0).set_value(0, 7i32);
        v.struct_child_mut(1).set_str(0, "x");
        v.set_null(1);
        assert_eq!(v.struct_child(0).value::<i32>(0), 7);
        assert_eq!(v.struct_child(1).str_at(0), "x");
        assert!(v.is_null(1));
    }

    #[test]
    fn test_copy_value_from_nested() {
        let src_type = ColumnType::List(Box::new(ColumnType::String));
        let mut src = ColumnVector::new(src_type.clone(), 2);
        let base = src.add_list_entry(0, 2) as usize;
        src.child_mut().set_str(base, "a");
        src.child_mut().set_str(base + 1, "bb");
        src.set_null(1);

        let mut dst = ColumnVector::new(src_type, 2);
        dst.copy_value_from(0, &src, 0);
        dst.copy_value_from(1, &src, 1);

        assert!(dst.is_null(1));
        let entry = dst.list_entry(0);
        assert_eq!(entry.len, 2);
        assert_eq!(dst.child().str_at(entry.offset as usize + 1), "bb");
    }
}
