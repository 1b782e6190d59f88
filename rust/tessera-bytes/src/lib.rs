//! Byte-level building blocks for the Tessera decoders: an aligned growable
//! byte vector, a bounds-checked cursor over borrowed buffers, and bit-level
//! pack/unpack helpers.

pub mod bits;
pub mod buffer;
pub mod cursor;

pub use buffer::ByteVec;
pub use cursor::ByteCursor;
