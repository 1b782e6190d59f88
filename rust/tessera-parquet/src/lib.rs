//! Parquet page-level column decoding: bit-stream decoders, page
//! decompression, per-type value conversion, and nested list/struct
//! reassembly, all writing into caller-owned column vectors.
//!
//! Thrift parsing is out of scope: footer metadata and page headers arrive
//! as already-parsed structs (see [`meta`]), and a [`meta::PageSource`]
//! supplies raw page bodies in chunk order.

pub mod codec;
pub mod column;
mod convert;
pub mod delta;
pub mod meta;
pub mod nested;
pub mod rle;

pub use column::ColumnReader;
pub use nested::{AnyColumnReader, ListReader, StructReader};
