//! A collection of values stored as bytes with alignment guarantees.

use tessera_bytes::ByteVec;

/// A typed view over an aligned byte buffer.
///
/// `Values` wraps a [`ByteVec`] and provides safe reinterpretation of its
/// contents as slices of fixed-width values.
#[derive(Debug, Clone, Default)]
pub struct Values(ByteVec);

impl Values {
    /// Creates a new, empty `Values` instance.
    pub fn new() -> Values {
        Values(ByteVec::new())
    }

    /// Creates a new instance filled with zeroed bytes for `len` elements of
    /// type `T`.
    pub fn zeroed<T>(len: usize) -> Values
    where
        T: bytemuck::Zeroable,
    {
        Values(ByteVec::zeroed(len * size_of::<T>()))
    }

    /// Creates a new instance filled with `bytes_len` zeroed bytes.
    pub fn zeroed_bytes(bytes_len: usize) -> Values {
        Values(ByteVec::zeroed(bytes_len))
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of complete elements of type `T` in the container.
    #[inline]
    pub fn len<T>(&self) -> usize {
        self.0.len() / size_of::<T>()
    }

    /// Returns the number of bytes in the container.
    #[inline]
    pub fn bytes_len(&self) -> usize {
        self.0.len()
    }

    /// Returns a reference to the underlying bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns a mutable reference to the underlying bytes.
    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }

    /// Interprets the contents as a slice of `T`.
    #[inline]
    pub fn as_slice<T>(&self) -> &[T]
    where
        T: bytemuck::AnyBitPattern,
    {
        self.0.typed_data()
    }

    /// Interprets the contents as a mutable slice of `T`.
    #[inline]
    pub fn as_mut_slice<T>(&mut self) -> &mut [T]
    where
        T: bytemuck::AnyBitPattern + bytemuck::NoUninit,
    {
        self.0.typed_data_mut()
    }

    /// Appends a single element of type `T`.
    #[inline]
    pub fn push<T>(&mut self, value: T)
    where
        T: bytemuck::NoUninit,
    {
        self.0.push_typed(value);
    }

    /// Extends the container with the contents of a byte slice.
    #[inline]
    pub fn extend_from_byte_slice(&mut self, bytes: &[u8]) {
        self.0.extend_from_slice(bytes);
    }

    /// Resizes to exactly `new_len` elements of type `T`, zero-filling any
    /// additional space.
    pub fn resize_zeroed<T>(&mut self, new_len: usize)
    where
        T: bytemuck::AnyBitPattern + bytemuck::NoUninit,
    {
        self.0.resize(new_len * size_of::<T>(), 0);
    }

    /// Resizes to exactly `new_len` bytes, zero-filling any additional space.
    pub fn resize_zeroed_bytes(&mut self, new_len: usize) {
        self.0.resize(new_len, 0);
    }

    /// Clears the container, retaining capacity.
    pub fn clear(&mut self) {
        self.0.clear();
    }
}
