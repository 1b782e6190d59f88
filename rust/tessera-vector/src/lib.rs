//! The caller-owned columnar destination that every Tessera decoder writes
//! into: a typed value buffer, a validity store, and (for variable-length or
//! nested types) an auxiliary heap or child vector.

pub mod presence;
pub mod types;
pub mod values;
pub mod vector;

pub use types::{ColumnType, Interval, ListEntry, StructField};
pub use vector::ColumnVector;
