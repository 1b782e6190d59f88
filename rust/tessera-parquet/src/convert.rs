//! Per-kind value conversion from plain-encoded page bytes into the output
//! vector.
//!
//! Each logical column kind is one variant of a closed enum carrying a
//! plain-read and a plain-skip path; dictionary lookups reuse the same reads
//! by decoding the dictionary page through them once and copying values out
//! of the dictionary vector afterwards.

use tessera_bytes::{ByteCursor, ByteVec};
use tessera_common::{Error, Result};
use tessera_vector::{ColumnType, ColumnVector, Interval};

use crate::meta::{ColumnDescriptor, ConvertedType, PhysicalType, TimestampUnit};

/// Days between the Julian epoch and the Unix epoch, for INT96 timestamps.
const JULIAN_TO_UNIX_DAYS: i64 = 2_440_588;
const MICROS_PER_DAY: i64 = 86_400_000_000;

/// Plain-decoding state over a page's value section. The boolean bit
/// position persists across `read` calls within one page.
pub(crate) struct PlainState {
    data: ByteVec,
    pos: usize,
    bool_byte: u8,
    bool_bits_left: u8,
}

impl PlainState {
    pub(crate) fn new(data: ByteVec, pos: usize) -> PlainState {
        PlainState {
            data,
            pos,
            bool_byte: 0,
            bool_bits_left: 0,
        }
    }

    pub(crate) fn into_buffer(self) -> ByteVec {
        self.data
    }

    /// Runs `f` over a cursor positioned at the current offset, committing
    /// the consumed length on success.
    fn with_cursor<R>(&mut self, f: impl FnOnce(&mut ByteCursor<'_>) -> Result<R>) -> Result<R> {
        let mut cursor = ByteCursor::new(&self.data);
        cursor.skip(self.pos)?;
        let result = f(&mut cursor)?;
        self.pos = cursor.position();
        Ok(result)
    }

    fn read_bit(&mut self) -> Result<bool> {
        if self.bool_bits_left == 0 {
            self.bool_byte = self.with_cursor(|c| c.read::<u8>())?;
            self.bool_bits_left = 8;
        }
        let bit = (self.bool_byte >> (8 - self.bool_bits_left)) & 1;
        self.bool_bits_left -= 1;
        Ok(bit != 0)
    }
}

/// The closed set of value-conversion strategies, one per logical column
/// kind the Parquet reader produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Converter {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Date,
    TimestampMillis,
    TimestampMicros,
    TimestampNanos,
    TimestampInt96,
    DecimalInt32,
    DecimalInt64,
    Decimal128(usize),
    Interval,
    Uuid,
    String,
    Blob,
    FixedBlob(usize),
}

impl Converter {
    /// Chooses the conversion for a `(physical type, output type)` pair,
    /// consulting the timestamp annotations where needed.
    pub(crate) fn from_descriptor(
        desc: &ColumnDescriptor,
        output: &ColumnType,
    ) -> Result<Converter> {
        use PhysicalType as P;
        let converter = match (desc.physical_type, output) {
            (P::Boolean, ColumnType::Bool) => Converter::Bool,
            (P::Int32, ColumnType::Int8) => Converter::Int8,
            (P::Int32, ColumnType::Int16) => Converter::Int16,
            (P::Int32, ColumnType::Int32) => Converter::Int32,
            (P::Int32, ColumnType::UInt8) => Converter::UInt8,
            (P::Int32, ColumnType::UInt16) => Converter::UInt16,
            (P::Int32, ColumnType::UInt32) => Converter::UInt32,
            (P::Int32, ColumnType::Date) => Converter::Date,
            (P::Int32, ColumnType::Int128) => Converter::DecimalInt32,
            (P::Int64, ColumnType::Int64) => Converter::Int64,
            (P::Int64, ColumnType::UInt64) => Converter::UInt64,
            (P::Int64, ColumnType::Int128) => Converter::DecimalInt64,
            (P::Int64, ColumnType::Timestamp) => Self::timestamp_converter(desc)?,
            (P::Int96, ColumnType::Timestamp) => Converter::TimestampInt96,
            (P::Float, ColumnType::Float32) => Converter::Float32,
            (P::Double, ColumnType::Float64) => Converter::Float64,
            (P::ByteArray, ColumnType::String) => Converter::String,
            (P::ByteArray, ColumnType::Blob) => Converter::Blob,
            (P::FixedLenByteArray, ColumnType::Uuid) => {
                if desc.type_length != 16 {
                    return Err(Error::schema_mismatch(
                        "UUID column",
                        format!("fixed length {} instead of 16", desc.type_length),
                    ));
                }
                Converter::Uuid
            }
            (P::FixedLenByteArray, ColumnType::Interval) => {
                if desc.type_length != 12 {
                    return Err(Error::schema_mismatch(
                        "INTERVAL column",
                        format!("fixed length {} instead of 12", desc.type_length),
                    ));
                }
                Converter::Interval
            }
            (P::FixedLenByteArray, ColumnType::Int128) => Converter::Decimal128(desc.type_length),
            (P::FixedLenByteArray, ColumnType::FixedSizeBlob(n)) => {
                if desc.type_length != *n {
                    return Err(Error::schema_mismatch(
                        "fixed-size blob column",
                        format!("fixed length {} instead of {n}", desc.type_length),
                    ));
                }
                Converter::FixedBlob(*n)
            }
            (P::FixedLenByteArray, ColumnType::Blob) => Converter::FixedBlob(desc.type_length),
            (physical, output) => {
                return Err(Error::schema_mismatch(
                    "column",
                    format!("cannot read {physical:?} data into a {output:?} column"),
                ));
            }
        };
        Ok(converter)
    }

    fn timestamp_converter(desc: &ColumnDescriptor) -> Result<Converter> {
        if let Some(unit) = desc.logical_timestamp {
            return Ok(match unit {
                TimestampUnit::Millis => Converter::TimestampMillis,
                TimestampUnit::Micros => Converter::TimestampMicros,
                TimestampUnit::Nanos => Converter::TimestampNanos,
            });
        }
        match &desc.converted_type {
            Some(ConvertedType::TimestampMillis) => Ok(Converter::TimestampMillis),
            Some(ConvertedType::TimestampMicros) => Ok(Converter::TimestampMicros),
            Some(other) => Err(Error::invalid_encoding(
                "TIMESTAMP column",
                format!("unknown legacy timestamp unit {other:?}"),
            )),
            None => Err(Error::schema_mismatch(
                "TIMESTAMP column",
                "INT64 timestamp without a unit annotation",
            )),
        }
    }

    /// Decodes one plain-encoded value into `out[index]`.
    pub(crate) fn plain_read(
        &self,
        state: &mut PlainState,
        out: &mut ColumnVector,
        index: usize,
    ) -> Result<()> {
        match *self {
            Converter::Bool => {
                let bit = state.read_bit()?;
                out.set_value(index, bit as u8);
            }
            Converter::Int8 => {
                let v = state.with_cursor(|c| c.read::<i32>())?;
                out.set_value(index, v as i8);
            }
            Converter::Int16 => {
                let v = state.with_cursor(|c| c.read::<i32>())?;
                out.set_value(index, v as i16);
            }
            Converter::Int32 => {
                let v = state.with_cursor(|c| c.read::<i32>())?;
                out.set_value(index, v);
            }
            Converter::Int64 => {
                let v = state.with_cursor(|c| c.read::<i64>())?;
                out.set_value(index, v);
            }
            Converter::UInt8 => {
                let v = state.with_cursor(|c| c.read::<u32>())?;
                out.set_value(index, v as u8);
            }
            Converter::UInt16 => {
                let v = state.with_cursor(|c| c.read::<u32>())?;
                out.set_value(index, v as u16);
            }
            Converter::UInt32 => {
                let v = state.with_cursor(|c| c.read::<u32>())?;
                out.set_value(index, v);
            }
            Converter::UInt64 => {
                let v = state.with_cursor(|c| c.read::<u64>())?;
                out.set_value(index, v);
            }
            Converter::Float32 => {
                let v = state.with_cursor(|c| c.read::<f32>())?;
                out.set_value(index, v);
            }
            Converter::Float64 => {
                let v = state.with_cursor(|c| c.read::<f64>())?;
                out.set_value(index, v);
            }
            Converter::Date => {
                let days = state.with_cursor(|c| c.read::<i32>())?;
                out.set_value(index, days);
            }
            Converter::TimestampMillis => {
                let v = state.with_cursor(|c| c.read::<i64>())?;
                out.set_value(index, v * 1000);
            }
            Converter::TimestampMicros => {
                let v = state.with_cursor(|c| c.read::<i64>())?;
                out.set_value(index, v);
            }
            Converter::TimestampNanos => {
                let v = state.with_cursor(|c| c.read::<i64>())?;
                out.set_value(index, v / 1000);
            }
            Converter::TimestampInt96 => {
                let (nanos_of_day, julian_day) =
                    state.with_cursor(|c| Ok((c.read::<u64>()?, c.read::<u32>()?)))?;
                let micros = (i64::from(julian_day) - JULIAN_TO_UNIX_DAYS) * MICROS_PER_DAY
                    + (nanos_of_day / 1000) as i64;
                out.set_value(index, micros);
            }
            Converter::DecimalInt32 => {
                let v = state.with_cursor(|c| c.read::<i32>())?;
                out.set_value(index, v as i128);
            }
            Converter::DecimalInt64 => {
                let v = state.with_cursor(|c| c.read::<i64>())?;
                out.set_value(index, v as i128);
            }
            Converter::Decimal128(len) => {
                let v = state.with_cursor(|c| {
                    let bytes = c.read_slice(len)?;
                    let mut value: i128 = if bytes.first().is_some_and(|b| b & 0x80 != 0) {
                        -1
                    } else {
                        0
                    };
                    for &byte in bytes {
                        value = (value << 8) | i128::from(byte);
                    }
                    Ok(value)
                })?;
                out.set_value(index, v);
            }
            Converter::Interval => {
                let (months, days, nanos) = state.with_cursor(|c| {
                    Ok((c.read::<u32>()?, c.read::<u32>()?, c.read::<u32>()?))
                })?;
                out.set_value(
                    index,
                    Interval::new(months as i32, days as i32, i64::from(nanos) / 1000),
                );
            }
            Converter::Uuid => {
                let v = state.with_cursor(|c| {
                    let bytes: [u8; 16] = c.read_slice(16)?.try_into().unwrap();
                    // Flip the sign bit so numeric order matches the
                    // lexicographic order of the canonical string form.
                    Ok((u128::from_be_bytes(bytes) ^ (1 << 127)) as i128)
                })?;
                out.set_value(index, v);
            }
            Converter::String => {
                let bytes = state.with_cursor(|c| {
                    let len = c.read::<u32>()? as usize;
                    Ok(c.read_slice(len)?.to_vec())
                })?;
                match std::str::from_utf8(&bytes) {
                    Ok(s) => out.set_str(index, s),
                    Err(_) => return Err(Error::invalid_utf8("STRING column", &bytes)),
                }
            }
            Converter::Blob => {
                let bytes = state.with_cursor(|c| {
                    let len = c.read::<u32>()? as usize;
                    Ok(c.read_slice(len)?.to_vec())
                })?;
                out.set_binary(index, &bytes);
            }
            Converter::FixedBlob(len) => {
                let bytes = state.with_cursor(|c| Ok(c.read_slice(len)?.to_vec()))?;
                out.set_binary(index, &bytes);
            }
        }
        Ok(())
    }

    /// Consumes one plain-encoded value without producing output.
    pub(crate) fn plain_skip(&self, state: &mut PlainState) -> Result<()> {
        match *self {
            Converter::Bool => {
                state.read_bit()?;
            }
            Converter::Int8
            | Converter::Int16
            | Converter::Int32
            | Converter::UInt8
            | Converter::UInt16
            | Converter::UInt32
            | Converter::Date
            | Converter::Float32
            | Converter::DecimalInt32 => {
                state.with_cursor(|c| c.skip(4))?;
            }
            Converter::Int64
            | Converter::UInt64
            | Converter::Float64
            | Converter::TimestampMillis
            | Converter::TimestampMicros
            | Converter::TimestampNanos
            | Converter::DecimalInt64 => {
                state.with_cursor(|c| c.skip(8))?;
            }
            Converter::TimestampInt96 | Converter::Interval => {
                state.with_cursor(|c| c.skip(12))?;
            }
            Converter::Uuid => {
                state.with_cursor(|c| c.skip(16))?;
            }
            Converter::Decimal128(len) | Converter::FixedBlob(len) => {
                state.with_cursor(|c| c.skip(len))?;
            }
            Converter::String | Converter::Blob => {
                state.with_cursor(|c| {
                    let len = c.read::<u32>()? as usize;
                    c.skip(len)
                })?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::ColumnDescriptor;

    fn state_of(bytes: &[u8]) -> PlainState {
        PlainState::new(ByteVec::copy_from_slice(bytes), 0)
    }

    #[test]
    fn test_bool_bit_position_across_reads() {
        let mut state = state_of(&[0b0000_0101]);
        let mut out = ColumnVector::new(ColumnType::Bool, 4);
        for i in 0..4 {
            Converter::Bool.plain_read(&mut state, &mut out, i).unwrap();
        }
        assert_eq!(out.value::<u8>(0), 1);
        assert_eq!(out.value::<u8>(1), 0);
        assert_eq!(out.value::<u8>(2), 1);
        assert_eq!(out.value::<u8>(3), 0);
    }

    #[test]
    fn test_int_widening_and_narrowing() {
        let mut state = state_of(&(-7i32).to_le_bytes());
        let mut out = ColumnVector::new(ColumnType::Int8, 1);
        Converter::Int8.plain_read(&mut state, &mut out, 0).unwrap();
        assert_eq!(out.value::<i8>(0), -7);

        let mut state = state_of(&123456i32.to_le_bytes());
        let mut out = ColumnVector::new(ColumnType::Int128, 1);
        Converter::DecimalInt32
            .plain_read(&mut state, &mut out, 0)
            .unwrap();
        assert_eq!(out.value::<i128>(0), 123456);
    }

    #[test]
    fn test_decimal128_big_endian_sign_extension() {
        let mut out = ColumnVector::new(ColumnType::Int128, 2);
        let mut state = state_of(&[0x00, 0x01, 0x00]);
        Converter::Decimal128(3)
            .plain_read(&mut state, &mut out, 0)
            .unwrap();
        assert_eq!(out.value::<i128>(0), 256);

        let mut state = state_of(&[0xff, 0xff, 0xfe]);
        Converter::Decimal128(3)
            .plain_read(&mut state, &mut out, 1)
            .unwrap();
        assert_eq!(out.value::<i128>(1), -2);
    }

    #[test]
    fn test_timestamp_units() {
        let mut out = ColumnVector::new(ColumnType::Timestamp, 3);
        let mut state = state_of(&1_000i64.to_le_bytes());
        Converter::TimestampMillis
            .plain_read(&mut state, &mut out, 0)
            .unwrap();
        assert_eq!(out.value::<i64>(0), 1_000_000);

        let mut state = state_of(&1_000i64.to_le_bytes());
        Converter::TimestampMicros
            .plain_read(&mut state, &mut out, 1)
            .unwrap();
        assert_eq!(out.value::<i64>(1), 1_000);

        let mut state = state_of(&1_000_000i64.to_le_bytes());
        Converter::TimestampNanos
            .plain_read(&mut state, &mut out, 2)
            .unwrap();
        assert_eq!(out.value::<i64>(2), 1_000);
    }

    #[test]
    fn test_int96_epoch() {
        // Julian day of the Unix epoch with zero nanos maps to timestamp 0.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0u64.to_le_bytes());
        bytes.extend_from_slice(&2_440_588u32.to_le_bytes());
        let mut state = state_of(&bytes);
        let mut out = ColumnVector::new(ColumnType::Timestamp, 1);
        Converter::TimestampInt96
            .plain_read(&mut state, &mut out, 0)
            .unwrap();
        assert_eq!(out.value::<i64>(0), 0);
    }

    #[test]
    fn test_uuid_order_flip() {
        let low = [0u8; 16];
        let mut high = [0u8; 16];
        high[0] = 0xff;
        let mut state = state_of(&[low, high].concat());
        let mut out = ColumnVector::new(ColumnType::Uuid, 2);
        Converter::Uuid.plain_read(&mut state, &mut out, 0).unwrap();
        Converter::Uuid.plain_read(&mut state, &mut out, 1).unwrap();
        // Lexicographically low UUID must compare below the high one.
        assert!(out.value::<i128>(0) < out.value::<i128>(1));
    }

    #[test]
    fn test_interval_nanos_truncation() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&14u32.to_le_bytes());
        bytes.extend_from_slice(&1_500u32.to_le_bytes());
        let mut state = state_of(&bytes);
        let mut out = ColumnVector::new(ColumnType::Interval, 1);
        Converter::Interval
            .plain_read(&mut state, &mut out, 0)
            .unwrap();
        assert_eq!(out.value::<Interval>(0), Interval::new(2, 14, 1));
    }

    #[test]
    fn test_string_utf8_validation() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&[0xff, 0xfe]);
        let mut state = state_of(&bytes);
        let mut out = ColumnVector::new(ColumnType::String, 1);
        let err = Converter::String
            .plain_read(&mut state, &mut out, 0)
            .unwrap_err();
        match err.into_kind() {
            tessera_common::error::ErrorKind::InvalidUtf8 { bytes, .. } => {
                assert_eq!(bytes, vec![0xff, 0xfe]);
            }
            other => panic!("unexpected error kind: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_legacy_timestamp_unit_is_an_error() {
        let desc = ColumnDescriptor::new(PhysicalType::Int64, 0, 0)
            .with_converted_type(ConvertedType::Other("TIME_MILLIS".into()));
        let err = Converter::from_descriptor(&desc, &ColumnType::Timestamp).unwrap_err();
        assert!(err.to_string().contains("TIME_MILLIS"));
    }

    #[test]
    fn test_plain_skip_matches_read_widths() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&5u32.to_le_bytes());
        bytes.extend_from_slice(b"hello");
        bytes.extend_from_slice(&7i32.to_le_bytes());
        let mut state = state_of(&bytes);
        Converter::String.plain_skip(&mut state).unwrap();
        let mut out = ColumnVector::new(ColumnType::Int32, 1);
        Converter::Int32.plain_read(&mut state, &mut out, 0).unwrap();
        assert_eq!(out.value::<i32>(0), 7);
    }
}
