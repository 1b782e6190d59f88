//! Nested column readers: lists reassembled from repetition levels, structs
//! recombined from per-field child readers.

use tessera_common::{Error, Result};
use tessera_vector::{ColumnType, ColumnVector, ListEntry};

use crate::column::{ColumnReader, SCRATCH_BATCH};

/// A reader for one column subtree: a leaf, a list over a subtree, or a
/// struct of subtrees. Dispatch is a `match`, keeping the composition
/// explicit.
pub enum AnyColumnReader {
    Leaf(ColumnReader),
    List(Box<ListReader>),
    Struct(StructReader),
}

impl AnyColumnReader {
    /// Reads up to `count` rows into `out` at `out_offset`, recording each
    /// row's definition and repetition level in the caller's buffers.
    ///
    /// Leaf and struct readers produce exactly `count` rows (or fail); list
    /// readers may produce fewer when the column chunk ends.
    pub fn read(
        &mut self,
        count: u64,
        define_out: &mut [u8],
        repeat_out: &mut [u8],
        out: &mut ColumnVector,
        out_offset: usize,
    ) -> Result<u64> {
        match self {
            AnyColumnReader::Leaf(reader) => {
                reader.read(count, define_out, repeat_out, out, out_offset)
            }
            AnyColumnReader::List(reader) => {
                reader.read(count, define_out, repeat_out, out, out_offset)
            }
            AnyColumnReader::Struct(reader) => {
                reader.read(count, define_out, repeat_out, out, out_offset)
            }
        }
    }

    /// Skips `count` rows by decoding into scratch storage.
    pub fn skip(&mut self, count: u64) -> Result<()> {
        match self {
            AnyColumnReader::Leaf(reader) => reader.skip(count),
            _ => {
                let mut remaining = count;
                while remaining > 0 {
                    let n = remaining.min(SCRATCH_BATCH);
                    let mut scratch = ColumnVector::new(self.output_type().clone(), n as usize);
                    let mut define = vec![0u8; n as usize];
                    let mut repeat = vec![0u8; n as usize];
                    let got = self.read(n, &mut define, &mut repeat, &mut scratch, 0)?;
                    if got == 0 {
                        break;
                    }
                    remaining -= got;
                }
                Ok(())
            }
        }
    }

    pub fn output_type(&self) -> &ColumnType {
        match self {
            AnyColumnReader::Leaf(reader) => reader.output_type(),
            AnyColumnReader::List(reader) => &reader.output_type,
            AnyColumnReader::Struct(reader) => &reader.output_type,
        }
    }

    /// Upper bound on the number of rows this subtree can still produce.
    pub fn values_remaining(&self) -> u64 {
        match self {
            AnyColumnReader::Leaf(reader) => reader.values_remaining(),
            AnyColumnReader::List(reader) => reader.child.values_remaining(),
            AnyColumnReader::Struct(reader) => reader.level_child().values_remaining(),
        }
    }

    /// Whether this subtree reports an exact row count per read. Lists (and
    /// maps, which read as lists) do not: their row boundaries only become
    /// known while consuming child values.
    fn exact_count(&self) -> bool {
        match self {
            AnyColumnReader::Leaf(_) => true,
            AnyColumnReader::List(_) => false,
            AnyColumnReader::Struct(reader) => {
                reader.children.iter().any(AnyColumnReader::exact_count)
            }
        }
    }
}

/// Reader for a struct column: every child reads the same row range, and the
/// struct's own validity is derived from the levels of a child whose type
/// guarantees an exact count.
pub struct StructReader {
    output_type: ColumnType,
    children: Vec<AnyColumnReader>,
    max_define: u32,
    scratch_define: Vec<u8>,
    scratch_repeat: Vec<u8>,
}

impl StructReader {
    pub fn new(
        output_type: ColumnType,
        children: Vec<AnyColumnReader>,
        max_define: u32,
    ) -> Result<StructReader> {
        if children.is_empty() {
            return Err(Error::schema_mismatch("struct column", "no children"));
        }
        if !matches!(output_type, ColumnType::Struct(_)) {
            return Err(Error::schema_mismatch(
                "struct column",
                "output type is not a struct",
            ));
        }
        Ok(StructReader {
            output_type,
            children,
            max_define,
            scratch_define: Vec::new(),
            scratch_repeat: Vec::new(),
        })
    }

    fn level_child_idx(&self) -> usize {
        self.children
            .iter()
            .position(AnyColumnReader::exact_count)
            .unwrap_or(0)
    }

    fn level_child(&self) -> &AnyColumnReader {
        &self.children[self.level_child_idx()]
    }

    fn read(
        &mut self,
        count: u64,
        define_out: &mut [u8],
        repeat_out: &mut [u8],
        out: &mut ColumnVector,
        out_offset: usize,
    ) -> Result<u64> {
        let level_child = self.level_child_idx();
        self.scratch_define.resize(out_offset + count as usize, 0);
        self.scratch_repeat.resize(out_offset + count as usize, 0);
        let mut counts = Vec::with_capacity(self.children.len());
        for child_idx in 0..self.children.len() {
            let field = out.struct_child_mut(child_idx);
            let rows = if child_idx == level_child {
                self.children[child_idx].read(count, define_out, repeat_out, field, out_offset)?
            } else {
                self.children[child_idx].read(
                    count,
                    &mut self.scratch_define,
                    &mut self.scratch_repeat,
                    field,
                    out_offset,
                )?
            };
            counts.push(rows);
        }
        let rows = counts[0];
        if counts.iter().any(|&c| c != rows) {
            return Err(Error::schema_mismatch(
                "struct column",
                format!("children reported different row counts: {counts:?}"),
            ));
        }
        let max_define = self.max_define as u8;
        for i in 0..rows as usize {
            if define_out[out_offset + i] < max_define {
                out.set_null(out_offset + i);
            } else {
                out.set_valid(out_offset + i);
            }
        }
        Ok(rows)
    }
}

/// Reader for a list column: consumes the child's value stream and uses
/// repetition levels to delimit rows, carrying unconsumed child values
/// across calls.
pub struct ListReader {
    output_type: ColumnType,
    child: Box<AnyColumnReader>,
    child_type: ColumnType,
    max_define: u32,
    max_repeat: u32,
    scratch: ColumnVector,
    scratch_define: Vec<u8>,
    scratch_repeat: Vec<u8>,
    scratch_len: usize,
    scratch_pos: usize,
}

/// A list row being assembled: levels of its first value and the child range
/// accumulated so far.
struct PendingRow {
    define: u8,
    repeat: u8,
    start: u64,
    len: u64,
}

impl ListReader {
    pub fn new(
        output_type: ColumnType,
        child: AnyColumnReader,
        max_define: u32,
        max_repeat: u32,
    ) -> Result<ListReader> {
        let ColumnType::List(inner) = &output_type else {
            return Err(Error::schema_mismatch(
                "list column",
                "output type is not a list",
            ));
        };
        let child_type = inner.as_ref().clone();
        Ok(ListReader {
            output_type,
            child: Box::new(child),
            child_type: child_type.clone(),
            max_define,
            max_repeat,
            scratch: ColumnVector::new(child_type, 0),
            scratch_define: Vec::new(),
            scratch_repeat: Vec::new(),
            scratch_len: 0,
            scratch_pos: 0,
        })
    }

    fn refill(&mut self) -> Result<()> {
        let n = SCRATCH_BATCH.min(self.child.values_remaining());
        if n == 0 {
            self.scratch_len = 0;
            self.scratch_pos = 0;
            return Ok(());
        }
        self.scratch = ColumnVector::new(self.child_type.clone(), n as usize);
        self.scratch_define.clear();
        self.scratch_define.resize(n as usize, 0);
        self.scratch_repeat.clear();
        self.scratch_repeat.resize(n as usize, 0);
        let got = self.child.read(
            n,
            &mut self.scratch_define,
            &mut self.scratch_repeat,
            &mut self.scratch,
            0,
        )?;
        self.scratch_len = got as usize;
        self.scratch_pos = 0;
        Ok(())
    }

    fn read(
        &mut self,
        count: u64,
        define_out: &mut [u8],
        repeat_out: &mut [u8],
        out: &mut ColumnVector,
        out_offset: usize,
    ) -> Result<u64> {
        let max_define = self.max_define as u8;
        let max_repeat = self.max_repeat as u8;
        let mut rows: u64 = 0;
        let mut pending: Option<PendingRow> = None;
        while rows < count {
            if self.scratch_pos == self.scratch_len {
                self.refill()?;
                if self.scratch_len == 0 {
                    if let Some(row) = pending.take() {
                        finalize_row(row, out, out_offset, rows, define_out, repeat_out, max_define);
                        rows += 1;
                    }
                    break;
                }
            }
            let i = self.scratch_pos;
            let define = self.scratch_define[i];
            let repeat = self.scratch_repeat[i];
            if repeat < max_repeat {
                // A repetition below this level starts a new row here.
                if let Some(row) = pending.take() {
                    finalize_row(row, out, out_offset, rows, define_out, repeat_out, max_define);
                    rows += 1;
                    if rows == count {
                        // The boundary value stays buffered for the next call.
                        break;
                    }
                }
                pending = Some(PendingRow {
                    define,
                    repeat,
                    start: out.child().len() as u64,
                    len: 0,
                });
            }
            let Some(row) = pending.as_mut() else {
                return Err(Error::invalid_encoding(
                    "list column",
                    "value continues a list that never started",
                ));
            };
            if define >= max_define {
                out.child_mut().grow_by(1);
                let dst = out.child().len() - 1;
                out.child_mut().copy_value_from(dst, &self.scratch, i);
                row.len += 1;
            }
            self.scratch_pos += 1;
        }
        Ok(rows)
    }
}

fn finalize_row(
    row: PendingRow,
    out: &mut ColumnVector,
    out_offset: usize,
    row_idx: u64,
    define_out: &mut [u8],
    repeat_out: &mut [u8],
    max_define: u8,
) {
    let index = out_offset + row_idx as usize;
    define_out[index] = row.define;
    repeat_out[index] = row.repeat;
    out.set_value(
        index,
        ListEntry {
            offset: row.start,
            len: row.len,
        },
    );
    // define == max_define - 1 is a present-but-empty list; anything lower
    // means the list itself (or an ancestor) is null.
    if u32::from(row.define) + 1 < u32::from(max_define) {
        out.set_null(index);
    }
}
