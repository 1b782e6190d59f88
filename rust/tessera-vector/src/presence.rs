//! Validity tracking for the values in a column vector.

use tessera_bytes::bits;

/// Validity store for a column vector.
///
/// Three representations are used: `Trivial` (all values valid), `Nulls`
/// (all values null), and `Bytes` (mixed, one byte per position, `1` for
/// present and `0` for null). The trivial forms are upgraded to `Bytes` on
/// the first write that breaks them, so vectors that never see a null pay
/// nothing for validity storage.
#[derive(Debug, Clone)]
pub enum Presence {
    /// All values are valid (present).
    Trivial(usize),

    /// All values are null.
    Nulls(usize),

    /// One byte per position: `1` - present, `0` - null.
    Bytes(Vec<u8>),
}

impl Presence {
    /// Returns the number of tracked positions, null or not.
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Self::Trivial(len) => *len,
            Self::Nulls(len) => *len,
            Self::Bytes(bytes) => bytes.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of null positions.
    pub fn count_nulls(&self) -> usize {
        match self {
            Self::Trivial(_) => 0,
            Self::Nulls(len) => *len,
            Self::Bytes(bytes) => bytes.iter().filter(|&&b| b == 0).count(),
        }
    }

    /// Returns `true` if the value at `index` is null.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[inline]
    pub fn is_null(&self, index: usize) -> bool {
        match self {
            Self::Trivial(len) => {
                assert!(index < *len);
                false
            }
            Self::Nulls(len) => {
                assert!(index < *len);
                true
            }
            Self::Bytes(bytes) => bytes[index] == 0,
        }
    }

    /// Returns `true` if the value at `index` is valid.
    #[inline]
    pub fn is_valid(&self, index: usize) -> bool {
        !self.is_null(index)
    }

    /// Marks the value at `index` as null, materializing the byte form if
    /// needed.
    pub fn set_null(&mut self, index: usize) {
        match self {
            Self::Nulls(len) => assert!(index < *len),
            Self::Trivial(_) => {
                self.materialize();
                self.set_null(index);
            }
            Self::Bytes(bytes) => bytes[index] = 0,
        }
    }

    /// Marks the value at `index` as valid, materializing the byte form if
    /// needed.
    pub fn set_valid(&mut self, index: usize) {
        match self {
            Self::Trivial(len) => assert!(index < *len),
            Self::Nulls(_) => {
                self.materialize();
                self.set_valid(index);
            }
            Self::Bytes(bytes) => bytes[index] = 1,
        }
    }

    /// Sets `count` positions starting at `index` to the given validity.
    pub fn set_range(&mut self, index: usize, count: usize, valid: bool) {
        match self {
            Self::Trivial(len) if valid => assert!(index + count <= *len),
            Self::Nulls(len) if !valid => assert!(index + count <= *len),
            Self::Bytes(bytes) => bytes[index..index + count].fill(valid as u8),
            _ => {
                self.materialize();
                self.set_range(index, count, valid);
            }
        }
    }

    /// Copies validity for `count` positions starting at `index` from an
    /// LSB-first Arrow-style validity bitmap (bit set - valid), reading bits
    /// starting at `bit_offset`.
    pub fn set_from_validity_bits(
        &mut self,
        index: usize,
        bits_buf: &[u8],
        bit_offset: usize,
        count: usize,
    ) {
        self.materialize();
        let Self::Bytes(bytes) = self else {
            unreachable!()
        };
        for i in 0..count {
            bytes[index + i] = bits::get_bit(bits_buf, bit_offset + i) as u8;
        }
    }

    /// Extends the tracked range by `count` valid positions.
    pub fn extend_valid(&mut self, count: usize) {
        match self {
            Self::Trivial(len) => *len += count,
            Self::Nulls(_) => {
                self.materialize();
                self.extend_valid(count);
            }
            Self::Bytes(bytes) => bytes.resize(bytes.len() + count, 1),
        }
    }

    fn materialize(&mut self) {
        match self {
            Self::Trivial(len) => *self = Self::Bytes(vec![1; *len]),
            Self::Nulls(len) => *self = Self::Bytes(vec![0; *len]),
            Self::Bytes(_) => {}
        }
    }
}
