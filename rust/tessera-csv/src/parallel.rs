//! Parallel CSV scanning: one reader per worker, each bound to a disjoint
//! byte range of the same file.
//!
//! No threads are managed here. A caller spawns workers, gives each one a
//! `ParallelCsvReader` over its own byte source, and collects batches. The
//! only shared state is the error handler and an atomic row counter used
//! for progress reporting, not correctness. Each worker's rows are
//! internally ordered; the global row order across workers is not
//! deterministic unless the caller orders blocks itself.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use tessera_common::Result;

use crate::{
    driver::{HeaderDriver, ParsingDriver, StringBatch},
    error::ErrorHandler,
    options::CsvOptions,
    reader::CsvReader,
    source::ByteSource,
};

/// Reader over one block `[block_start, block_end)` of a CSV file.
///
/// A block that does not start at offset zero begins parsing at the first
/// line start past `block_start`; rows whose first byte lies inside the
/// block are parsed to completion even when they end past `block_end`.
pub struct ParallelCsvReader<S: ByteSource> {
    reader: CsvReader<S>,
    block_start: u64,
    block_end: u64,
    started: bool,
    total_rows: Arc<AtomicU64>,
}

impl<S: ByteSource> ParallelCsvReader<S> {
    pub fn new(
        source: S,
        options: CsvOptions,
        file_idx: u32,
        block_start: u64,
        block_end: u64,
        total_rows: Arc<AtomicU64>,
    ) -> ParallelCsvReader<S> {
        debug_assert_eq!(options.skip_rows, 0, "skipping rows is not parallel-safe");
        let mut reader = CsvReader::new(source, options, file_idx);
        reader.set_allow_quoted_newlines(false);
        ParallelCsvReader {
            reader,
            block_start,
            block_end,
            started: false,
            total_rows,
        }
    }

    /// Whether every row starting inside the block has been consumed. The
    /// comparison is strict so that a row starting exactly at `block_end`
    /// still belongs to this block.
    pub fn finished_block(&self) -> bool {
        self.started
            && (self.reader.file_offset() > self.block_end || self.reader.is_eof())
    }

    /// Parses up to `batch.capacity()` rows of this block into `batch`.
    pub fn parse_block(
        &mut self,
        batch: &mut StringBatch,
        handler: &mut dyn ErrorHandler,
    ) -> Result<(u64, u64)> {
        if !self.started {
            self.enter_block(handler)?;
            self.started = true;
        }
        // The block may have been consumed entirely by the partial-line
        // skip, or by earlier batches; never read into the next block.
        if self.finished_block() {
            return Ok((0, 0));
        }
        batch.reset();
        let options = self.reader.options.clone();
        let mut driver = ParsingDriver::new(batch, &options);
        let result = self.reader.parse_csv(&mut driver, handler)?;
        self.reader.finish_parse();
        self.total_rows.fetch_add(result.0, Ordering::Relaxed);
        Ok(result)
    }

    fn enter_block(&mut self, handler: &mut dyn ErrorHandler) -> Result<()> {
        if self.block_start == 0 {
            self.reader.read_bom()?;
            if self.reader.options.has_header {
                let mut driver = HeaderDriver;
                self.reader.parse_csv(&mut driver, handler)?;
                self.reader.finish_parse();
            }
        } else {
            // Land on the first row boundary inside the block.
            self.reader.seek_to(self.block_start)?;
            self.reader.skip_partial_line()?;
        }
        self.reader.set_scan_end(Some(self.block_end));
        Ok(())
    }
}
