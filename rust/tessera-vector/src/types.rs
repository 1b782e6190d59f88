//! Logical column types and the fixed-width value layouts that go with them.

/// A named field of a [`ColumnType::Struct`].
#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    pub name: String,
    pub column_type: ColumnType,
}

impl StructField {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> StructField {
        StructField {
            name: name.into(),
            column_type,
        }
    }
}

/// The closed set of logical column kinds the ingestion engine produces.
///
/// Fixed-width kinds store their values directly in the vector's value
/// buffer. `String`, `Blob` and `FixedSizeBlob` slots hold a
/// `(heap offset, length)` pair pointing into the vector's auxiliary heap.
/// `List` slots hold a [`ListEntry`] into a growable child vector; `Struct`
/// has one child vector per field and no value buffer of its own.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Int128,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    /// Days since the Unix epoch, stored as `i32`.
    Date,
    /// Microseconds since the Unix epoch, stored as `i64`.
    Timestamp,
    Interval,
    /// 16-byte identifier stored as `i128` so that numeric order matches
    /// the lexicographic order of the canonical string form.
    Uuid,
    String,
    Blob,
    FixedSizeBlob(usize),
    List(Box<ColumnType>),
    Struct(Vec<StructField>),
    /// Tagged union: a one-byte tag per slot selecting among the member
    /// vectors, which all share the parent's length.
    Union(Vec<StructField>),
}

impl ColumnType {
    /// Returns the width in bytes of one value slot, or `None` for `Struct`,
    /// which has no value buffer.
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            ColumnType::Bool
            | ColumnType::Int8
            | ColumnType::UInt8
            | ColumnType::Union(_) => Some(1),
            ColumnType::Int16 | ColumnType::UInt16 => Some(2),
            ColumnType::Int32 | ColumnType::UInt32 | ColumnType::Float32 | ColumnType::Date => {
                Some(4)
            }
            ColumnType::Int64
            | ColumnType::UInt64
            | ColumnType::Float64
            | ColumnType::Timestamp => Some(8),
            ColumnType::Int128 | ColumnType::Uuid | ColumnType::Interval => Some(16),
            ColumnType::String | ColumnType::Blob | ColumnType::FixedSizeBlob(_) => {
                Some(size_of::<ValueRef>())
            }
            ColumnType::List(_) => Some(size_of::<ListEntry>()),
            ColumnType::Struct(_) => None,
        }
    }

    /// Returns `true` for kinds whose payload lives in the auxiliary heap.
    pub fn is_var_len(&self) -> bool {
        matches!(
            self,
            ColumnType::String | ColumnType::Blob | ColumnType::FixedSizeBlob(_)
        )
    }
}

/// An interval value at the engine's microsecond resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Interval {
    pub months: i32,
    pub days: i32,
    pub micros: i64,
}

impl Interval {
    pub fn new(months: i32, days: i32, micros: i64) -> Interval {
        Interval {
            months,
            days,
            micros,
        }
    }
}

/// A list slot: the range `offset..offset + len` in the child vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct ListEntry {
    pub offset: u64,
    pub len: u64,
}

/// A variable-length slot: the byte range `offset..offset + len` in the
/// vector's auxiliary heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct ValueRef {
    pub offset: u64,
    pub len: u64,
}
