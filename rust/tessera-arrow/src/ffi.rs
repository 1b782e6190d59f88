//! The Arrow C Data Interface surface, consumed but never owned.
//!
//! `ArrowSchema` and `ArrowArray` are the exact C ABI structs any
//! Arrow-compliant producer exports. All raw-pointer handling is confined to
//! this module: the converter and null-mask code only see [`ArrayView`], a
//! borrowed schema/array pair with checked accessors, so recursion passes
//! views rather than addresses.

use std::ffi::{CStr, c_char, c_void};

use tessera_common::{Error, Result};

/// `ArrowSchema` per the Arrow C Data Interface specification.
#[repr(C)]
#[derive(Debug)]
pub struct ArrowSchema {
    pub format: *const c_char,
    pub name: *const c_char,
    pub metadata: *const c_char,
    pub flags: i64,
    pub n_children: i64,
    pub children: *mut *mut ArrowSchema,
    pub dictionary: *mut ArrowSchema,
    pub release: Option<unsafe extern "C" fn(*mut ArrowSchema)>,
    pub private_data: *mut c_void,
}

/// `ArrowArray` per the Arrow C Data Interface specification.
#[repr(C)]
#[derive(Debug)]
pub struct ArrowArray {
    pub length: i64,
    pub null_count: i64,
    pub offset: i64,
    pub n_buffers: i64,
    pub n_children: i64,
    pub buffers: *mut *const c_void,
    pub children: *mut *mut ArrowArray,
    pub dictionary: *mut ArrowArray,
    pub release: Option<unsafe extern "C" fn(*mut ArrowArray)>,
    pub private_data: *mut c_void,
}

/// A borrowed `(schema, array)` pair.
///
/// Buffer lengths are not part of the C ABI; they are implied by the
/// array's `length`, `offset` and type. Accessors therefore take the element
/// count the caller derived from those fields, and trust the producer to
/// have sized the buffers accordingly, as the interface contract requires.
#[derive(Clone, Copy)]
pub struct ArrayView<'a> {
    schema: &'a ArrowSchema,
    array: &'a ArrowArray,
}

impl<'a> ArrayView<'a> {
    /// Pairs a schema with an array.
    ///
    /// # Safety
    ///
    /// Both structs must be live, released by no one for the duration of the
    /// borrow, and produced by an Arrow-compliant implementation (children,
    /// buffers and format pointers valid and consistent).
    pub unsafe fn new(schema: &'a ArrowSchema, array: &'a ArrowArray) -> Result<ArrayView<'a>> {
        if schema.format.is_null() {
            return Err(Error::invalid_arg("schema", "null format string"));
        }
        if schema.n_children != array.n_children {
            return Err(Error::schema_mismatch(
                "arrow array",
                format!(
                    "schema declares {} children, array carries {}",
                    schema.n_children, array.n_children
                ),
            ));
        }
        Ok(ArrayView { schema, array })
    }

    /// The schema's format string.
    pub fn format(&self) -> &'a str {
        // Validity of the pointer is part of the `new` contract.
        unsafe { CStr::from_ptr(self.schema.format) }
            .to_str()
            .unwrap_or("")
    }

    #[inline]
    pub fn length(&self) -> u64 {
        self.array.length as u64
    }

    #[inline]
    pub fn offset(&self) -> u64 {
        self.array.offset as u64
    }

    #[inline]
    pub fn n_children(&self) -> usize {
        self.array.n_children as usize
    }

    #[inline]
    pub fn n_buffers(&self) -> usize {
        self.array.n_buffers as usize
    }

    /// The child view at `index`.
    pub fn child(&self, index: usize) -> Result<ArrayView<'a>> {
        if index >= self.n_children() {
            return Err(Error::schema_mismatch(
                "arrow array",
                format!("child {index} out of {} requested", self.n_children()),
            ));
        }
        unsafe {
            let schema = &**self.schema.children.add(index);
            let array = &**self.array.children.add(index);
            ArrayView::new(schema, array)
        }
    }

    /// The dictionary view, for dictionary-encoded arrays.
    pub fn dictionary(&self) -> Result<Option<ArrayView<'a>>> {
        if self.schema.dictionary.is_null() || self.array.dictionary.is_null() {
            return Ok(None);
        }
        unsafe {
            Ok(Some(ArrayView::new(
                &*self.schema.dictionary,
                &*self.array.dictionary,
            )?))
        }
    }

    /// Raw pointer to buffer `index`, null when absent.
    fn buffer_ptr(&self, index: usize) -> *const u8 {
        if index >= self.n_buffers() {
            return std::ptr::null();
        }
        unsafe { *self.array.buffers.add(index) as *const u8 }
    }

    /// Buffer `index` as `len` values of `T`. Fails on a missing buffer.
    pub fn typed_buffer<T: bytemuck::AnyBitPattern>(
        &self,
        index: usize,
        len: usize,
    ) -> Result<&'a [T]> {
        let ptr = self.buffer_ptr(index);
        if ptr.is_null() {
            return Err(Error::invalid_arg(
                "arrow array",
                format!("buffer {index} is absent"),
            ));
        }
        Ok(unsafe { std::slice::from_raw_parts(ptr as *const T, len) })
    }

    /// Buffer `index` as `len` bytes, or `None` when the buffer is absent
    /// (an absent validity buffer means all-valid).
    pub fn byte_buffer_opt(&self, index: usize, len: usize) -> Option<&'a [u8]> {
        let ptr = self.buffer_ptr(index);
        if ptr.is_null() {
            return None;
        }
        Some(unsafe { std::slice::from_raw_parts(ptr, len) })
    }

    /// The validity bitmap (buffer 0) sized for `bits` bits, when present.
    pub fn validity_bits(&self, bits: u64) -> Option<&'a [u8]> {
        self.byte_buffer_opt(0, (bits as usize).div_ceil(8))
    }
}

impl std::fmt::Debug for ArrayView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArrayView")
            .field("format", &self.format())
            .field("length", &self.length())
            .field("offset", &self.offset())
            .finish()
    }
}
