/// A growable byte vector whose data start is aligned to a 64-byte boundary,
/// allowing its contents to be reinterpreted as slices of any primitive type.
///
/// `ByteVec` is the backing store for decoded column values and the scratch
/// space for page decompression. Reuse across pages goes through
/// [`ByteVec::reset_to`], which is the only sanctioned way to recycle
/// capacity: content beyond the most recent reset length must never be read.
pub struct ByteVec {
    /// The underlying vector; may include padding at the front.
    inner: Vec<u8>,
    /// Offset from the start of `inner` to the aligned data start.
    start: u32,
}

impl ByteVec {
    pub const ALIGNMENT: usize = 64;

    /// Creates a new empty vector with no allocation.
    pub fn new() -> ByteVec {
        ByteVec {
            inner: Vec::new(),
            start: 0,
        }
    }

    /// Creates a new vector with at least the specified capacity.
    pub fn with_capacity(capacity: usize) -> ByteVec {
        Self::make(capacity)
    }

    /// Creates a new vector of the specified length, filled with zeros.
    pub fn zeroed(len: usize) -> ByteVec {
        let mut v = ByteVec::with_capacity(len);
        v.resize(len, 0);
        v
    }

    /// Creates a new vector containing a copy of the provided slice.
    pub fn copy_from_slice(data: &[u8]) -> ByteVec {
        let mut v = ByteVec::with_capacity(data.len());
        v.extend_from_slice(data);
        v
    }

    /// Returns the number of bytes in the vector.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len() - self.start as usize
    }

    /// Returns `true` if the vector contains no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of bytes the vector can hold without reallocating.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.inner.capacity().saturating_sub(self.start as usize)
    }

    /// Returns a slice containing the entire vector.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.inner[self.start as usize..]
    }

    /// Returns a mutable slice containing the entire vector.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.inner[self.start as usize..]
    }

    /// Reserves capacity for at least `additional` more bytes.
    pub fn reserve(&mut self, additional: usize) {
        if self.capacity() - self.len() >= additional {
            return;
        }
        self.grow(additional);
    }

    /// Appends a slice to the vector.
    #[inline]
    pub fn extend_from_slice(&mut self, s: &[u8]) {
        self.reserve(s.len());
        self.inner.extend_from_slice(s);
    }

    /// Resizes the vector to `new_len` bytes, filling any new space with
    /// `value`.
    pub fn resize(&mut self, new_len: usize, value: u8) {
        let len = self.len();
        if new_len > len {
            self.reserve(new_len - len);
        }
        self.inner.resize(self.start as usize + new_len, value);
    }

    /// Truncates the vector to `new_len` bytes.
    pub fn truncate(&mut self, new_len: usize) {
        if new_len < self.len() {
            self.inner.truncate(self.start as usize + new_len);
        }
    }

    /// Clears the vector, removing all bytes and retaining capacity.
    pub fn clear(&mut self) {
        self.inner.truncate(self.start as usize);
    }

    /// Resets the vector to exactly `len` bytes, reusing existing capacity.
    ///
    /// Shrinking truncates; growing zero-fills the newly exposed range. This
    /// is the single call site for recycling a scratch buffer between pages:
    /// after `reset_to(n)`, only bytes `0..n` are meaningful and the caller
    /// is expected to overwrite them in full.
    pub fn reset_to(&mut self, len: usize) {
        if len <= self.len() {
            self.inner.truncate(self.start as usize + len);
        } else {
            self.resize(len, 0);
        }
    }
}

impl ByteVec {
    /// Appends a value of type `T` by copying its bytes.
    #[inline]
    pub fn push_typed<T>(&mut self, value: T)
    where
        T: bytemuck::NoUninit,
    {
        self.extend_from_slice(bytemuck::bytes_of(&value));
    }

    /// Appends a slice of values of type `T` by copying their bytes.
    #[inline]
    pub fn extend_from_typed_slice<T>(&mut self, values: &[T])
    where
        T: bytemuck::NoUninit,
    {
        self.extend_from_slice(bytemuck::cast_slice(values));
    }

    /// Resizes the vector to hold `new_count` elements of type `T`, filling
    /// any new space with `value`.
    pub fn resize_typed<T>(&mut self, new_count: usize, value: T)
    where
        T: bytemuck::AnyBitPattern + bytemuck::NoUninit,
    {
        let count = self.len() / size_of::<T>();
        if new_count > count {
            self.reserve((new_count - count) * size_of::<T>());
            for _ in count..new_count {
                self.inner.extend_from_slice(bytemuck::bytes_of(&value));
            }
        } else {
            self.inner
                .truncate(self.start as usize + new_count * size_of::<T>());
        }
    }

    /// Interprets the contents as a slice of `T`, ignoring any trailing bytes
    /// that do not form a whole element.
    #[inline]
    pub fn typed_data<T>(&self) -> &[T]
    where
        T: bytemuck::AnyBitPattern,
    {
        let len = self.len() / size_of::<T>() * size_of::<T>();
        bytemuck::cast_slice(&self.as_slice()[..len])
    }

    /// Interprets the contents as a mutable slice of `T`, ignoring any
    /// trailing bytes that do not form a whole element.
    #[inline]
    pub fn typed_data_mut<T>(&mut self) -> &mut [T]
    where
        T: bytemuck::AnyBitPattern + bytemuck::NoUninit,
    {
        let len = self.len() / size_of::<T>() * size_of::<T>();
        bytemuck::cast_slice_mut(&mut self.as_mut_slice()[..len])
    }

    fn make(capacity: usize) -> ByteVec {
        let mut inner = Vec::with_capacity(capacity + Self::ALIGNMENT);
        let misalign = inner.as_ptr() as usize % Self::ALIGNMENT;
        let start = if misalign == 0 {
            0
        } else {
            Self::ALIGNMENT - misalign
        };
        inner.resize(start, 0);
        ByteVec {
            inner,
            start: start as u32,
        }
    }

    fn grow(&mut self, additional: usize) {
        let new_capacity = (self.len() + additional).max(self.capacity() * 2);
        let mut replacement = Self::make(new_capacity);
        replacement.inner.extend_from_slice(self.as_slice());
        *self = replacement;
    }
}

impl Default for ByteVec {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for ByteVec {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl std::ops::DerefMut for ByteVec {
    #[inline]
    fn deref_mut(&mut self) -> &mut [u8] {
        self.as_mut_slice()
    }
}

impl std::fmt::Debug for ByteVec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteVec").field("len", &self.len()).finish()
    }
}

impl Clone for ByteVec {
    fn clone(&self) -> Self {
        ByteVec::copy_from_slice(self.as_slice())
    }
}
