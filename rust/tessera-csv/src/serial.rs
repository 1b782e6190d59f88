//! Serial (single-threaded) CSV scanning.

use tessera_common::Result;

use crate::{
    driver::{HeaderDriver, ParsingDriver, SkipRowDriver, StringBatch},
    error::ErrorHandler,
    options::CsvOptions,
    reader::CsvReader,
    source::ByteSource,
};

/// Serial scan over one CSV source: BOM and skip/header handling up front,
/// then batches of rows on demand.
pub struct SerialCsvReader<S: ByteSource> {
    reader: CsvReader<S>,
}

impl<S: ByteSource> SerialCsvReader<S> {
    pub fn new(source: S, options: CsvOptions, file_idx: u32) -> SerialCsvReader<S> {
        SerialCsvReader {
            reader: CsvReader::new(source, options, file_idx),
        }
    }

    pub fn reader(&self) -> &CsvReader<S> {
        &self.reader
    }

    pub fn reader_mut(&mut self) -> &mut CsvReader<S> {
        &mut self.reader
    }

    /// Consumes the BOM, the configured skip rows, and the header line.
    /// Returns the `(rows, errors)` consumed.
    pub fn handle_first_block(&mut self, handler: &mut dyn ErrorHandler) -> Result<(u64, u64)> {
        self.reader.read_bom()?;
        let mut rows = 0;
        let mut errors = 0;
        if self.reader.options.skip_rows > 0 {
            let mut driver = SkipRowDriver {
                skip_rows: self.reader.options.skip_rows,
            };
            let (r, e) = self.reader.parse_csv(&mut driver, handler)?;
            self.reader.finish_parse();
            rows += r;
            errors += e;
        }
        if self.reader.options.has_header {
            let mut driver = HeaderDriver;
            let (r, e) = self.reader.parse_csv(&mut driver, handler)?;
            self.reader.finish_parse();
            rows += r;
            errors += e;
        }
        Ok((rows, errors))
    }

    /// Parses up to `batch.capacity()` rows into `batch`. Returns
    /// `(rows_read, rows_errored)`; both zero at end of file.
    pub fn read_batch(
        &mut self,
        batch: &mut StringBatch,
        handler: &mut dyn ErrorHandler,
    ) -> Result<(u64, u64)> {
        batch.reset();
        let options = self.reader.options.clone();
        let mut driver = ParsingDriver::new(batch, &options);
        let result = self.reader.parse_csv(&mut driver, handler)?;
        self.reader.finish_parse();
        Ok(result)
    }

    pub fn is_eof(&self) -> bool {
        self.reader.is_eof()
    }
}
