//! The format-string-driven array converter.
//!
//! `from_arrow_array` walks a schema/array pair and fills a column vector,
//! composing the array's own slice offset with the caller-supplied source
//! offset in every branch. Scans are based on the columnar specification at
//! <https://arrow.apache.org/docs/format/Columnar.html>; all offsets are
//! measured in values, not bytes.

use tessera_bytes::bits;
use tessera_common::{Error, Result};
use tessera_vector::{ColumnType, ColumnVector, Interval};

use crate::{
    ffi::ArrayView,
    null_mask::{NullMaskTree, parse_fixed_size},
};

const MICROS_PER_SECOND: i64 = 1_000_000;

/// Converts the array's own slice (`offset..offset+length`) into
/// `out[0..length)`.
pub fn from_arrow_array(view: &ArrayView<'_>, out: &mut ColumnVector) -> Result<()> {
    let mask = NullMaskTree::build(view)?;
    scan(view, out, &mask, view.offset(), 0, view.length() as usize)
}

/// Recursive scan of `count` values starting at absolute source position
/// `src_offset` (the array's internal offset already composed in) into
/// `out[dst_offset..dst_offset+count)`.
pub fn scan(
    view: &ArrayView<'_>,
    out: &mut ColumnVector,
    mask: &NullMaskTree,
    src_offset: u64,
    dst_offset: usize,
    count: usize,
) -> Result<()> {
    if view.dictionary()?.is_some() {
        return scan_dictionary_encoded(view, out, mask, src_offset, dst_offset, count);
    }
    let format = view.format();
    match format.as_bytes().first().copied().unwrap_or(0) {
        b'n' => {
            for i in 0..count {
                out.set_null(dst_offset + i);
            }
            Ok(())
        }
        b'b' => scan_bool(view, out, mask, src_offset, dst_offset, count),
        b'c' => scan_primitive::<i8>(view, out, mask, src_offset, dst_offset, count),
        b'C' => scan_primitive::<u8>(view, out, mask, src_offset, dst_offset, count),
        b's' => scan_primitive::<i16>(view, out, mask, src_offset, dst_offset, count),
        b'S' => scan_primitive::<u16>(view, out, mask, src_offset, dst_offset, count),
        b'i' => scan_primitive::<i32>(view, out, mask, src_offset, dst_offset, count),
        b'I' => scan_primitive::<u32>(view, out, mask, src_offset, dst_offset, count),
        b'l' => scan_primitive::<i64>(view, out, mask, src_offset, dst_offset, count),
        b'L' => scan_primitive::<u64>(view, out, mask, src_offset, dst_offset, count),
        b'f' => scan_primitive::<f32>(view, out, mask, src_offset, dst_offset, count),
        b'g' => scan_primitive::<f64>(view, out, mask, src_offset, dst_offset, count),
        b'd' => scan_decimal(view, out, mask, src_offset, dst_offset, count),
        b'z' | b'u' => scan_varlen::<i32>(view, out, mask, src_offset, dst_offset, count),
        b'Z' | b'U' => scan_varlen::<i64>(view, out, mask, src_offset, dst_offset, count),
        b'v' => match format.as_bytes().get(1).copied().unwrap_or(0) {
            b'u' | b'z' => scan_view_layout(view, out, mask, src_offset, dst_offset, count),
            _ => Err(unimplemented_format(format)),
        },
        b'w' => scan_fixed_blob(view, out, mask, src_offset, dst_offset, count),
        b't' => scan_temporal(view, out, mask, src_offset, dst_offset, count),
        b'+' => match format.as_bytes().get(1).copied().unwrap_or(0) {
            b'l' | b'm' => scan_list::<i32>(view, out, mask, src_offset, dst_offset, count),
            b'L' => scan_list::<i64>(view, out, mask, src_offset, dst_offset, count),
            b'w' => scan_fixed_list(view, out, mask, src_offset, dst_offset, count),
            b's' => scan_struct(view, out, mask, src_offset, dst_offset, count),
            b'u' => {
                if format.as_bytes().get(2) == Some(&b'd') {
                    scan_dense_union(view, out, mask, src_offset, dst_offset, count)
                } else {
                    scan_sparse_union(view, out, mask, src_offset, dst_offset, count)
                }
            }
            b'v' => match format.as_bytes().get(2).copied().unwrap_or(0) {
                b'l' => scan_list_view::<i32>(view, out, mask, src_offset, dst_offset, count),
                b'L' => scan_list_view::<i64>(view, out, mask, src_offset, dst_offset, count),
                _ => Err(unimplemented_format(format)),
            },
            b'r' => scan_run_end_encoded(view, out, mask, src_offset, dst_offset, count),
            _ => Err(unimplemented_format(format)),
        },
        _ => Err(unimplemented_format(format)),
    }
}

fn unimplemented_format(format: &str) -> Error {
    Error::not_implemented(format!("arrow type with format '{format}'"))
}

trait OffsetValue: bytemuck::AnyBitPattern + Copy {
    fn as_i64(self) -> i64;
}

impl OffsetValue for i32 {
    fn as_i64(self) -> i64 {
        i64::from(self)
    }
}

impl OffsetValue for i64 {
    fn as_i64(self) -> i64 {
        self
    }
}

fn check_var_len(out: &ColumnVector) -> Result<()> {
    if out.column_type().is_var_len() {
        Ok(())
    } else {
        Err(Error::schema_mismatch(
            "arrow scan",
            format!(
                "destination {:?} cannot hold variable-length values",
                out.column_type()
            ),
        ))
    }
}

fn check_kind(out: &ColumnVector, want: &str, ok: bool) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(Error::schema_mismatch(
            "arrow scan",
            format!("destination {:?} is not a {want} column", out.column_type()),
        ))
    }
}

fn check_width(out: &ColumnVector, width: usize) -> Result<()> {
    if out.column_type().fixed_width() == Some(width) {
        Ok(())
    } else {
        Err(Error::schema_mismatch(
            "arrow scan",
            format!(
                "destination {:?} cannot hold {width}-byte values",
                out.column_type()
            ),
        ))
    }
}

fn scan_bool(
    view: &ArrayView<'_>,
    out: &mut ColumnVector,
    mask: &NullMaskTree,
    src_offset: u64,
    dst_offset: usize,
    count: usize,
) -> Result<()> {
    check_width(out, 1)?;
    let packed: &[u8] =
        view.typed_buffer(1, (src_offset as usize + count).div_ceil(8))?;
    mask.copy_to_vector(out, dst_offset, count);
    for i in 0..count {
        if !mask.is_null(i as u64) {
            out.set_value(
                dst_offset + i,
                bits::get_bit(packed, src_offset as usize + i) as u8,
            );
        }
    }
    Ok(())
}

fn scan_primitive<T>(
    view: &ArrayView<'_>,
    out: &mut ColumnVector,
    mask: &NullMaskTree,
    src_offset: u64,
    dst_offset: usize,
    count: usize,
) -> Result<()>
where
    T: bytemuck::AnyBitPattern + bytemuck::NoUninit,
{
    check_width(out, size_of::<T>())?;
    let values: &[T] = view.typed_buffer(1, src_offset as usize + count)?;
    mask.copy_to_vector(out, dst_offset, count);
    for i in 0..count {
        if !mask.is_null(i as u64) {
            out.set_value(dst_offset + i, values[src_offset as usize + i]);
        }
    }
    Ok(())
}

/// Decimal128 values, widened or narrowed to the destination's physical
/// width. Decimal256 is not supported.
fn scan_decimal(
    view: &ArrayView<'_>,
    out: &mut ColumnVector,
    mask: &NullMaskTree,
    src_offset: u64,
    dst_offset: usize,
    count: usize,
) -> Result<()> {
    let format = view.format();
    if format.split(',').nth(2).is_some_and(|bits_str| bits_str != "128") {
        return Err(unimplemented_format(format));
    }
    let values: &[i128] = view.typed_buffer(1, src_offset as usize + count)?;
    mask.copy_to_vector(out, dst_offset, count);
    for i in 0..count {
        if mask.is_null(i as u64) {
            continue;
        }
        let value = values[src_offset as usize + i];
        match out.column_type() {
            ColumnType::Int16 => out.set_value(dst_offset + i, value as i16),
            ColumnType::Int32 => out.set_value(dst_offset + i, value as i32),
            ColumnType::Int64 => out.set_value(dst_offset + i, value as i64),
            ColumnType::Int128 => out.set_value(dst_offset + i, value),
            other => {
                return Err(Error::schema_mismatch(
                    "arrow scan",
                    format!("decimal128 into a {other:?} column"),
                ));
            }
        }
    }
    Ok(())
}

fn scan_varlen<T: OffsetValue>(
    view: &ArrayView<'_>,
    out: &mut ColumnVector,
    mask: &NullMaskTree,
    src_offset: u64,
    dst_offset: usize,
    count: usize,
) -> Result<()> {
    check_var_len(out)?;
    let offsets: &[T] = view.typed_buffer(1, src_offset as usize + count + 1)?;
    let data_end = offsets[src_offset as usize + count].as_i64() as usize;
    let data: &[u8] = view.typed_buffer(2, data_end)?;
    mask.copy_to_vector(out, dst_offset, count);
    for i in 0..count {
        if !mask.is_null(i as u64) {
            let from = offsets[src_offset as usize + i].as_i64() as usize;
            let to = offsets[src_offset as usize + i + 1].as_i64() as usize;
            out.set_binary(dst_offset + i, &data[from..to]);
        }
    }
    Ok(())
}

/// The 16-byte view layout: short values inline, long values indexed into
/// one of the variadic data buffers.
fn scan_view_layout(
    view: &ArrayView<'_>,
    out: &mut ColumnVector,
    mask: &NullMaskTree,
    src_offset: u64,
    dst_offset: usize,
    count: usize,
) -> Result<()> {
    check_var_len(out)?;
    let views: &[u8] = view.typed_buffer(1, (src_offset as usize + count) * 16)?;
    mask.copy_to_vector(out, dst_offset, count);
    for i in 0..count {
        if mask.is_null(i as u64) {
            continue;
        }
        let entry = &views[(src_offset as usize + i) * 16..(src_offset as usize + i + 1) * 16];
        let len = i32::from_le_bytes(entry[0..4].try_into().unwrap()) as usize;
        if len <= 12 {
            out.set_binary(dst_offset + i, &entry[4..4 + len]);
        } else {
            let buffer_idx = i32::from_le_bytes(entry[8..12].try_into().unwrap()) as usize;
            let data_offset = i32::from_le_bytes(entry[12..16].try_into().unwrap()) as usize;
            let data = view
                .byte_buffer_opt(2 + buffer_idx, data_offset + len)
                .ok_or_else(|| {
                    Error::invalid_arg("arrow array", format!("view buffer {buffer_idx} absent"))
                })?;
            out.set_binary(dst_offset + i, &data[data_offset..data_offset + len]);
        }
    }
    Ok(())
}

fn scan_fixed_blob(
    view: &ArrayView<'_>,
    out: &mut ColumnVector,
    mask: &NullMaskTree,
    src_offset: u64,
    dst_offset: usize,
    count: usize,
) -> Result<()> {
    check_var_len(out)?;
    let size = parse_fixed_size(view.format())?;
    let data: &[u8] = view.typed_buffer(1, (src_offset as usize + count) * size)?;
    mask.copy_to_vector(out, dst_offset, count);
    for i in 0..count {
        if !mask.is_null(i as u64) {
            let from = (src_offset as usize + i) * size;
            out.set_binary(dst_offset + i, &data[from..from + size]);
        }
    }
    Ok(())
}

/// Dates, timestamps, durations and the three interval layouts.
fn scan_temporal(
    view: &ArrayView<'_>,
    out: &mut ColumnVector,
    mask: &NullMaskTree,
    src_offset: u64,
    dst_offset: usize,
    count: usize,
) -> Result<()> {
    let format = view.format();
    let kind = format.as_bytes().get(1).copied().unwrap_or(0);
    let unit = format.as_bytes().get(2).copied().unwrap_or(0);
    match (kind, unit) {
        // Days since the epoch map straight onto the engine's date.
        (b'd', b'D') => scan_primitive::<i32>(view, out, mask, src_offset, dst_offset, count),
        // Milliseconds since the epoch become a microsecond timestamp.
        (b'd', b'm') => {
            scan_scaled_i64(view, out, mask, src_offset, dst_offset, count, |v| v * 1000)
        }
        (b's', b's') => scan_scaled_i64(view, out, mask, src_offset, dst_offset, count, |v| {
            v * MICROS_PER_SECOND
        }),
        (b's', b'm') => {
            scan_scaled_i64(view, out, mask, src_offset, dst_offset, count, |v| v * 1000)
        }
        (b's', b'u') => scan_scaled_i64(view, out, mask, src_offset, dst_offset, count, |v| v),
        (b's', b'n') => {
            scan_scaled_i64(view, out, mask, src_offset, dst_offset, count, |v| v / 1000)
        }
        // Durations scale into the interval's microsecond field; seconds,
        // millis and micros scale up, nanos scale down.
        (b'D', b's') => scan_duration(view, out, mask, src_offset, dst_offset, count, |v| {
            v * MICROS_PER_SECOND
        }),
        (b'D', b'm') => {
            scan_duration(view, out, mask, src_offset, dst_offset, count, |v| v * 1000)
        }
        (b'D', b'u') => scan_duration(view, out, mask, src_offset, dst_offset, count, |v| v),
        (b'D', b'n') => {
            scan_duration(view, out, mask, src_offset, dst_offset, count, |v| v / 1000)
        }
        (b'i', b'M') => {
            check_width(out, 16)?;
            let values: &[i32] = view.typed_buffer(1, src_offset as usize + count)?;
            mask.copy_to_vector(out, dst_offset, count);
            for i in 0..count {
                if !mask.is_null(i as u64) {
                    let months = values[src_offset as usize + i];
                    out.set_value(dst_offset + i, Interval::new(months, 0, 0));
                }
            }
            Ok(())
        }
        (b'i', b'D') => {
            // Packed day (low half) and milliseconds (high half).
            check_width(out, 16)?;
            let values: &[i64] = view.typed_buffer(1, src_offset as usize + count)?;
            mask.copy_to_vector(out, dst_offset, count);
            for i in 0..count {
                if !mask.is_null(i as u64) {
                    let packed = values[src_offset as usize + i];
                    let days = packed as i32;
                    let micros = (packed >> 32) * 1000;
                    out.set_value(dst_offset + i, Interval::new(0, days, micros));
                }
            }
            Ok(())
        }
        (b'i', b'n') => {
            // 16 bytes: months and days packed in the first half, then
            // nanoseconds.
            check_width(out, 16)?;
            let values: &[i64] = view.typed_buffer(1, (src_offset as usize + count) * 2)?;
            mask.copy_to_vector(out, dst_offset, count);
            for i in 0..count {
                if !mask.is_null(i as u64) {
                    let packed = values[(src_offset as usize + i) * 2];
                    let months = packed as i32;
                    let days = (packed >> 32) as i32;
                    let micros = values[(src_offset as usize + i) * 2 + 1] / 1000;
                    out.set_value(dst_offset + i, Interval::new(months, days, micros));
                }
            }
            Ok(())
        }
        _ => Err(unimplemented_format(format)),
    }
}

fn scan_scaled_i64(
    view: &ArrayView<'_>,
    out: &mut ColumnVector,
    mask: &NullMaskTree,
    src_offset: u64,
    dst_offset: usize,
    count: usize,
    scale: impl Fn(i64) -> i64,
) -> Result<()> {
    check_width(out, 8)?;
    let values: &[i64] = view.typed_buffer(1, src_offset as usize + count)?;
    mask.copy_to_vector(out, dst_offset, count);
    for i in 0..count {
        if !mask.is_null(i as u64) {
            out.set_value(dst_offset + i, scale(values[src_offset as usize + i]));
        }
    }
    Ok(())
}

fn scan_duration(
    view: &ArrayView<'_>,
    out: &mut ColumnVector,
    mask: &NullMaskTree,
    src_offset: u64,
    dst_offset: usize,
    count: usize,
    scale: impl Fn(i64) -> i64,
) -> Result<()> {
    check_width(out, 16)?;
    let values: &[i64] = view.typed_buffer(1, src_offset as usize + count)?;
    mask.copy_to_vector(out, dst_offset, count);
    for i in 0..count {
        if !mask.is_null(i as u64) {
            let micros = scale(values[src_offset as usize + i]);
            out.set_value(dst_offset + i, Interval::new(0, 0, micros));
        }
    }
    Ok(())
}

fn scan_list<T: OffsetValue>(
    view: &ArrayView<'_>,
    out: &mut ColumnVector,
    mask: &NullMaskTree,
    src_offset: u64,
    dst_offset: usize,
    count: usize,
) -> Result<()> {
    check_kind(out, "list", matches!(out.column_type(), ColumnType::List(_)))?;
    let offsets: &[T] = view.typed_buffer(1, src_offset as usize + count + 1)?;
    mask.copy_to_vector(out, dst_offset, count);
    // Entries are recorded even for null lists so the auxiliary offsets
    // stay consistent.
    let mut aux_dst = 0u64;
    for i in 0..count {
        let len = (offsets[src_offset as usize + i + 1].as_i64()
            - offsets[src_offset as usize + i].as_i64()) as u64;
        let child_pos = out.add_list_entry(dst_offset + i, len);
        if i == 0 {
            aux_dst = child_pos;
        }
    }
    let child = view.child(0)?;
    let first = offsets[src_offset as usize].as_i64() as u64;
    let total = (offsets[src_offset as usize + count].as_i64()
        - offsets[src_offset as usize].as_i64()) as usize;
    scan(
        &child,
        out.child_mut(),
        mask.child(0),
        first + child.offset(),
        aux_dst as usize,
        total,
    )
}

/// List views carry independent `(offset, size)` pairs per entry; child
/// validity is computed per value since ranges may overlap arbitrarily.
fn scan_list_view<T: OffsetValue>(
    view: &ArrayView<'_>,
    out: &mut ColumnVector,
    mask: &NullMaskTree,
    src_offset: u64,
    dst_offset: usize,
    count: usize,
) -> Result<()> {
    check_kind(out, "list", matches!(out.column_type(), ColumnType::List(_)))?;
    let offsets: &[T] = view.typed_buffer(1, src_offset as usize + count)?;
    let sizes: &[T] = view.typed_buffer(2, src_offset as usize + count)?;
    mask.copy_to_vector(out, dst_offset, count);
    let child = view.child(0)?;
    for i in 0..count {
        if mask.is_null(i as u64) {
            continue;
        }
        let from = offsets[src_offset as usize + i].as_i64() as u64;
        let len = sizes[src_offset as usize + i].as_i64() as u64;
        let child_pos = out.add_list_entry(dst_offset + i, len);
        let child_base = from + child.offset();
        let child_mask = NullMaskTree::build_range(&child, child_base, len)?;
        scan(
            &child,
            out.child_mut(),
            &child_mask,
            child_base,
            child_pos as usize,
            len as usize,
        )?;
    }
    Ok(())
}

fn scan_fixed_list(
    view: &ArrayView<'_>,
    out: &mut ColumnVector,
    mask: &NullMaskTree,
    src_offset: u64,
    dst_offset: usize,
    count: usize,
) -> Result<()> {
    check_kind(out, "list", matches!(out.column_type(), ColumnType::List(_)))?;
    let per_entry = parse_fixed_size(view.format())? as u64;
    mask.copy_to_vector(out, dst_offset, count);
    let mut aux_dst = 0u64;
    for i in 0..count {
        let child_pos = out.add_list_entry(dst_offset + i, per_entry);
        if i == 0 {
            aux_dst = child_pos;
        }
    }
    let child = view.child(0)?;
    scan(
        &child,
        out.child_mut(),
        mask.child(0),
        src_offset * per_entry + child.offset(),
        aux_dst as usize,
        count * per_entry as usize,
    )
}

/// Struct validity is written first; children are populated for every row,
/// including rows where the struct itself is null, since a child may be
/// independently valid under Arrow's struct semantics.
fn scan_struct(
    view: &ArrayView<'_>,
    out: &mut ColumnVector,
    mask: &NullMaskTree,
    src_offset: u64,
    dst_offset: usize,
    count: usize,
) -> Result<()> {
    check_kind(
        out,
        "struct",
        matches!(out.column_type(), ColumnType::Struct(_)),
    )?;
    mask.copy_to_vector(out, dst_offset, count);
    for child_idx in 0..view.n_children() {
        let child = view.child(child_idx)?;
        scan(
            &child,
            out.struct_child_mut(child_idx),
            mask.child(child_idx),
            src_offset + child.offset(),
            dst_offset,
            count,
        )?;
    }
    Ok(())
}

/// Dense unions store one child entry per selected row; locations are
/// non-contiguous per type, so scanning is necessarily per value, with a
/// first-incident table giving each child's local offset base.
fn scan_dense_union(
    view: &ArrayView<'_>,
    out: &mut ColumnVector,
    mask: &NullMaskTree,
    src_offset: u64,
    dst_offset: usize,
    count: usize,
) -> Result<()> {
    check_kind(
        out,
        "union",
        matches!(out.column_type(), ColumnType::Union(_)),
    )?;
    let type_ids: &[i8] = view.typed_buffer(0, src_offset as usize + count)?;
    let offsets: &[i32] = view.typed_buffer(1, src_offset as usize + count)?;
    mask.copy_to_vector(out, dst_offset, count);
    let mut first_incident = vec![i32::MAX; view.n_children()];
    for i in 0..count {
        let tag = type_ids[src_offset as usize + i] as usize;
        let value_offset = offsets[src_offset as usize + i];
        if value_offset < first_incident[tag] {
            first_incident[tag] = value_offset;
        }
        if mask.is_null(i as u64) {
            continue;
        }
        out.set_value(dst_offset + i, tag as u8);
        let child = view.child(tag)?;
        let child_mask = mask
            .child(tag)
            .offset_by(i64::from(value_offset - first_incident[tag]));
        scan(
            &child,
            out.struct_child_mut(tag),
            &child_mask,
            value_offset as u64 + child.offset(),
            dst_offset + i,
            1,
        )?;
    }
    Ok(())
}

/// Sparse unions keep one child entry per row for every member; the
/// specification requires non-selected entries to be well-defined, which is
/// what makes a full per-child scan correct.
fn scan_sparse_union(
    view: &ArrayView<'_>,
    out: &mut ColumnVector,
    mask: &NullMaskTree,
    src_offset: u64,
    dst_offset: usize,
    count: usize,
) -> Result<()> {
    check_kind(
        out,
        "union",
        matches!(out.column_type(), ColumnType::Union(_)),
    )?;
    let type_ids: &[i8] = view.typed_buffer(0, src_offset as usize + count)?;
    mask.copy_to_vector(out, dst_offset, count);
    for i in 0..count {
        if !mask.is_null(i as u64) {
            out.set_value(dst_offset + i, type_ids[src_offset as usize + i] as u8);
        }
    }
    for child_idx in 0..view.n_children() {
        let child = view.child(child_idx)?;
        scan(
            &child,
            out.struct_child_mut(child_idx),
            mask.child(child_idx),
            src_offset + child.offset(),
            dst_offset,
            count,
        )?;
    }
    Ok(())
}

/// Run-end encoded arrays: binary-search the run covering `src_offset`
/// once, then advance the run cursor monotonically while emitting values.
fn scan_run_end_encoded(
    view: &ArrayView<'_>,
    out: &mut ColumnVector,
    mask: &NullMaskTree,
    src_offset: u64,
    dst_offset: usize,
    count: usize,
) -> Result<()> {
    let run_ends_view = view.child(0)?;
    if run_ends_view.format() != "i" {
        return Err(Error::not_implemented(format!(
            "run ends of format '{}'",
            run_ends_view.format()
        )));
    }
    let values_view = view.child(1)?;
    let base = run_ends_view.offset() as usize;
    let len = run_ends_view.length() as usize;
    let run_ends: &[i32] = run_ends_view.typed_buffer(1, base + len)?;
    let window = &run_ends[base..base + len];

    let mut run_idx = window.partition_point(|&end| (end as u64) <= src_offset);
    for i in 0..count {
        while run_idx < window.len() && (window[run_idx] as u64) <= src_offset + i as u64 {
            run_idx += 1;
        }
        if run_idx >= window.len() {
            return Err(Error::invalid_arg(
                "arrow array",
                "run-end buffer ends before the requested range",
            ));
        }
        let value_mask = mask.child(1).offset_by(run_idx as i64);
        scan(
            &values_view,
            out,
            &value_mask,
            values_view.offset() + run_idx as u64,
            dst_offset + i,
            1,
        )?;
    }
    Ok(())
}

trait IndexValue: bytemuck::AnyBitPattern + Copy {
    fn as_u64(self) -> u64;
}

macro_rules! impl_index_value {
    ($($t:ty),*) => {
        $(impl IndexValue for $t {
            #[inline]
            fn as_u64(self) -> u64 {
                self as u64
            }
        })*
    };
}

impl_index_value!(i8, u8, i16, u16, i32, u32, i64, u64);

/// Dictionary-encoded arrays of any index width: each value recurses into
/// the dictionary once, rebasing the dictionary's validity by the decoded
/// index.
fn scan_dictionary_encoded(
    view: &ArrayView<'_>,
    out: &mut ColumnVector,
    mask: &NullMaskTree,
    src_offset: u64,
    dst_offset: usize,
    count: usize,
) -> Result<()> {
    match view.format().as_bytes().first().copied().unwrap_or(0) {
        b'c' => scan_dictionary_indices::<i8>(view, out, mask, src_offset, dst_offset, count),
        b'C' => scan_dictionary_indices::<u8>(view, out, mask, src_offset, dst_offset, count),
        b's' => scan_dictionary_indices::<i16>(view, out, mask, src_offset, dst_offset, count),
        b'S' => scan_dictionary_indices::<u16>(view, out, mask, src_offset, dst_offset, count),
        b'i' => scan_dictionary_indices::<i32>(view, out, mask, src_offset, dst_offset, count),
        b'I' => scan_dictionary_indices::<u32>(view, out, mask, src_offset, dst_offset, count),
        b'l' => scan_dictionary_indices::<i64>(view, out, mask, src_offset, dst_offset, count),
        b'L' => scan_dictionary_indices::<u64>(view, out, mask, src_offset, dst_offset, count),
        _ => Err(Error::invalid_arg(
            "arrow array",
            format!("invalid dictionary index type '{}'", view.format()),
        )),
    }
}

fn scan_dictionary_indices<T: IndexValue>(
    view: &ArrayView<'_>,
    out: &mut ColumnVector,
    mask: &NullMaskTree,
    src_offset: u64,
    dst_offset: usize,
    count: usize,
) -> Result<()> {
    let indices: &[T] = view.typed_buffer(1, src_offset as usize + count)?;
    let dictionary = view
        .dictionary()?
        .ok_or_else(|| Error::invalid_arg("arrow array", "dictionary data is absent"))?;
    let dictionary_mask = mask.dictionary().ok_or_else(|| {
        Error::invalid_arg("arrow array", "dictionary array without a dictionary mask")
    })?;
    mask.copy_to_vector(out, dst_offset, count);
    for i in 0..count {
        if mask.is_null(i as u64) {
            continue;
        }
        let index = indices[src_offset as usize + i].as_u64();
        let rebased = dictionary_mask.offset_by(index as i64);
        scan(
            &dictionary,
            out,
            &rebased,
            index + dictionary.offset(),
            dst_offset + i,
            1,
        )?;
    }
    Ok(())
}
