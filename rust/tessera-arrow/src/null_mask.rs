//! Precomputed validity for an Arrow array tree.
//!
//! The converter resolves "is this value null" many times per recursion
//! level; this tree mirrors the schema once per conversion call and answers
//! from unpacked byte masks, pushing parent nulls down onto list and struct
//! children so each node's answer is already combined. All offsets are
//! measured in values, not bytes.

use std::sync::Arc;

use tessera_bytes::bits;
use tessera_common::{Error, Result};
use tessera_vector::ColumnVector;

use crate::ffi::ArrayView;

/// Offset widths the list layouts use.
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

/// A node of the validity tree: a byte mask (1 for valid) over the node's
/// scanned range, a rebase offset for dictionary and run-end lookups, and
/// derived child nodes.
#[derive(Debug, Clone, Default)]
pub struct NullMaskTree {
    mask: Arc<Vec<u8>>,
    offset: i64,
    children: Arc<Vec<NullMaskTree>>,
    dictionary: Option<Arc<NullMaskTree>>,
}

impl NullMaskTree {
    /// Builds the tree for the array's own slice (`offset..offset+length`).
    pub fn build(view: &ArrayView<'_>) -> Result<NullMaskTree> {
        Self::build_at(view, view.offset(), view.length(), None)
    }

    /// Builds a tree over an explicit value range. Used by list views, whose
    /// child windows only become known per entry.
    pub(crate) fn build_range(
        view: &ArrayView<'_>,
        src_offset: u64,
        count: u64,
    ) -> Result<NullMaskTree> {
        Self::build_at(view, src_offset, count, None)
    }

    /// Returns a copy of this node rebased by `delta`; lookups through the
    /// copy see `is_null(i)` as `is_null(i + delta)` of the original. Used
    /// for dictionary and run-end indirection.
    pub fn offset_by(&self, delta: i64) -> NullMaskTree {
        let mut copy = self.clone();
        copy.offset += delta;
        copy
    }

    #[inline]
    pub fn is_null(&self, index: u64) -> bool {
        let position = index as i64 + self.offset;
        self.mask[position as usize] == 0
    }

    pub fn child(&self, index: usize) -> &NullMaskTree {
        &self.children[index]
    }

    pub fn dictionary(&self) -> Option<&NullMaskTree> {
        self.dictionary.as_deref()
    }

    /// Writes this node's validity into `out[dst_offset..dst_offset+count)`.
    pub fn copy_to_vector(&self, out: &mut ColumnVector, dst_offset: usize, count: usize) {
        for i in 0..count {
            if self.is_null(i as u64) {
                out.set_null(dst_offset + i);
            } else {
                out.set_valid(dst_offset + i);
            }
        }
    }

    fn build_at(
        view: &ArrayView<'_>,
        src_offset: u64,
        count: u64,
        parent: Option<&[u8]>,
    ) -> Result<NullMaskTree> {
        if let Some(dictionary_view) = view.dictionary()? {
            let mut mask = validity_bytes(view, src_offset, count);
            apply_parent(&mut mask, parent);
            let dictionary = Self::build_at(
                &dictionary_view,
                dictionary_view.offset(),
                dictionary_view.length(),
                None,
            )?;
            return Ok(NullMaskTree {
                mask: Arc::new(mask),
                offset: 0,
                children: Arc::new(Vec::new()),
                dictionary: Some(Arc::new(dictionary)),
            });
        }

        let format = view.format();
        let mut mask;
        let mut children = Vec::new();
        match format.as_bytes().first().copied().unwrap_or(0) {
            b'n' => {
                mask = vec![0u8; count as usize];
            }
            b'b' | b'c' | b'C' | b's' | b'S' | b'i' | b'I' | b'l' | b'L' | b'd' | b'f' | b'g' => {
                mask = validity_bytes(view, src_offset, count);
            }
            b'z' | b'Z' | b'u' | b'U' | b'v' | b'w' | b't' => {
                mask = validity_bytes(view, src_offset, count);
                apply_parent(&mut mask, parent);
            }
            b'+' => match format.as_bytes().get(1).copied().unwrap_or(0) {
                b'l' | b'm' => {
                    mask = validity_bytes(view, src_offset, count);
                    apply_parent(&mut mask, parent);
                    children.push(Self::list_push_down::<i32>(
                        view, src_offset, count, &mask,
                    )?);
                }
                b'L' => {
                    mask = validity_bytes(view, src_offset, count);
                    apply_parent(&mut mask, parent);
                    children.push(Self::list_push_down::<i64>(
                        view, src_offset, count, &mask,
                    )?);
                }
                b'w' => {
                    mask = validity_bytes(view, src_offset, count);
                    apply_parent(&mut mask, parent);
                    children.push(Self::fixed_list_push_down(view, src_offset, count, &mask)?);
                }
                b's' => {
                    mask = validity_bytes(view, src_offset, count);
                    apply_parent(&mut mask, parent);
                    for child_idx in 0..view.n_children() {
                        let child = view.child(child_idx)?;
                        children.push(Self::build_at(
                            &child,
                            src_offset + child.offset(),
                            count,
                            Some(&mask),
                        )?);
                    }
                }
                b'u' => {
                    mask = Self::build_union(
                        view,
                        src_offset,
                        count,
                        format.as_bytes().get(2) == Some(&b'd'),
                        &mut children,
                    )?;
                    apply_parent(&mut mask, parent);
                }
                b'v' => {
                    // List views: child validity is resolved per value during
                    // scanning, since the (offset, size) pairs overlap freely.
                    mask = validity_bytes(view, src_offset, count);
                    apply_parent(&mut mask, parent);
                }
                b'r' => {
                    // Run-end encoding: validity lives on the values child
                    // and is resolved while walking runs.
                    mask = vec![1u8; count as usize];
                    for child_idx in 0..view.n_children() {
                        let child = view.child(child_idx)?;
                        children.push(Self::build_at(
                            &child,
                            child.offset(),
                            child.length(),
                            None,
                        )?);
                    }
                }
                other => {
                    return Err(Error::not_implemented(format!(
                        "arrow nested format '+{}'",
                        other as char
                    )));
                }
            },
            other => {
                return Err(Error::not_implemented(format!(
                    "arrow format '{}'",
                    other as char
                )));
            }
        }
        Ok(NullMaskTree {
            mask: Arc::new(mask),
            offset: 0,
            children: Arc::new(children),
            dictionary: None,
        })
    }

    /// Expands this list's nulls over its child's index ranges and builds
    /// the child node under that combined mask.
    fn list_push_down<T: OffsetValue>(
        view: &ArrayView<'_>,
        src_offset: u64,
        count: u64,
        own_mask: &[u8],
    ) -> Result<NullMaskTree> {
        let offsets: &[T] = view.typed_buffer(1, (src_offset + count) as usize + 1)?;
        let first = offsets[src_offset as usize].as_i64();
        let last = offsets[(src_offset + count) as usize].as_i64();
        let aux_len = (last - first) as usize;
        let mut push_down = vec![1u8; aux_len];
        for i in 0..count as usize {
            if own_mask[i] == 0 {
                let from = (offsets[src_offset as usize + i].as_i64() - first) as usize;
                let to = (offsets[src_offset as usize + i + 1].as_i64() - first) as usize;
                push_down[from..to].fill(0);
            }
        }
        let child = view.child(0)?;
        Self::build_at(
            &child,
            (first as u64) + child.offset(),
            aux_len as u64,
            Some(&push_down),
        )
    }

    fn fixed_list_push_down(
        view: &ArrayView<'_>,
        src_offset: u64,
        count: u64,
        own_mask: &[u8],
    ) -> Result<NullMaskTree> {
        let per_entry = parse_fixed_size(view.format())?;
        let aux_len = count as usize * per_entry;
        let mut push_down = vec![1u8; aux_len];
        for i in 0..count as usize {
            if own_mask[i] == 0 {
                push_down[i * per_entry..(i + 1) * per_entry].fill(0);
            }
        }
        let child = view.child(0)?;
        Self::build_at(
            &child,
            src_offset * per_entry as u64 + child.offset(),
            aux_len as u64,
            Some(&push_down),
        )
    }

    fn build_union(
        view: &ArrayView<'_>,
        src_offset: u64,
        count: u64,
        dense: bool,
        children: &mut Vec<NullMaskTree>,
    ) -> Result<Vec<u8>> {
        let type_ids: &[i8] = view.typed_buffer(0, (src_offset + count) as usize)?;
        let mut mask = vec![1u8; count as usize];
        if dense {
            let offsets: &[i32] = view.typed_buffer(1, (src_offset + count) as usize)?;
            let n_children = view.n_children();
            let mut lowest = vec![0i32; n_children];
            let mut highest = vec![0i32; n_children];
            let mut seen = vec![false; n_children];
            for i in src_offset as usize..(src_offset + count) as usize {
                let tag = type_ids[i] as usize;
                let value_offset = offsets[i];
                if !seen[tag] {
                    lowest[tag] = value_offset;
                    seen[tag] = true;
                }
                highest[tag] = value_offset;
            }
            for child_idx in 0..n_children {
                let child = view.child(child_idx)?;
                children.push(Self::build_at(
                    &child,
                    (lowest[child_idx] as u64) + child.offset(),
                    (highest[child_idx] - lowest[child_idx] + 1) as u64,
                    None,
                )?);
            }
            for i in 0..count as usize {
                let tag = type_ids[src_offset as usize + i] as usize;
                let value_offset = offsets[src_offset as usize + i];
                let valid = !children[tag].is_null((value_offset - lowest[tag]) as u64);
                mask[i] = valid as u8;
            }
        } else {
            for child_idx in 0..view.n_children() {
                let child = view.child(child_idx)?;
                children.push(Self::build_at(
                    &child,
                    src_offset + child.offset(),
                    count,
                    None,
                )?);
            }
            for i in 0..count as usize {
                let tag = type_ids[src_offset as usize + i] as usize;
                let valid = !children[tag].is_null(i as u64);
                mask[i] = valid as u8;
            }
        }
        Ok(mask)
    }
}

/// Validity of `[src_offset, src_offset + count)` as bytes (1 for valid);
/// an absent validity buffer means all values are present.
fn validity_bytes(view: &ArrayView<'_>, src_offset: u64, count: u64) -> Vec<u8> {
    match view.validity_bits(src_offset + count) {
        None => vec![1u8; count as usize],
        Some(bits_buf) => {
            let mut bytes = Vec::with_capacity(count as usize);
            bits::unpack_bits_to_bytes(bits_buf, src_offset as usize, count as usize, &mut bytes);
            bytes
        }
    }
}

fn apply_parent(mask: &mut [u8], parent: Option<&[u8]>) {
    if let Some(parent) = parent {
        for (own, inherited) in mask.iter_mut().zip(parent) {
            *own &= *inherited;
        }
    }
}

/// Parses the trailing size of a `w:N` or `+w:N` format string.
pub(crate) fn parse_fixed_size(format: &str) -> Result<usize> {
    let digits = format
        .rsplit(':')
        .next()
        .unwrap_or_default();
    digits.parse().map_err(|_| {
        Error::invalid_arg(
            "arrow format",
            format!("missing fixed size in format '{format}'"),
        )
    })
}
