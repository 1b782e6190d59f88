//! The CSV error boundary: structured warnings delivered to a caller-owned
//! handler that decides between skip-and-count and aborting the read.

use tessera_common::{Error, Result};

/// One malformed-row report, carrying enough source attribution to
/// reconstruct the offending line later.
#[derive(Debug, Clone)]
pub struct ParseWarning {
    pub message: String,
    pub start_byte_offset: u64,
    pub end_byte_offset: u64,
    pub block_idx: u64,
    pub row_offset_in_block: u64,
    pub file_idx: u32,
    pub complete_line: bool,
    pub must_throw: bool,
}

/// Decides recoverability for parse errors. Returning `Err` aborts the whole
/// read; returning `Ok(())` lets the reader count the row as an error and
/// resume at the next line start.
pub trait ErrorHandler {
    fn handle(&mut self, warning: ParseWarning) -> Result<()>;
}

/// Handler honoring the `ignore_errors` option: recoverable warnings are
/// collected, `must_throw` warnings abort regardless.
#[derive(Debug, Default)]
pub struct CollectingErrorHandler {
    ignore_errors: bool,
    warnings: Vec<ParseWarning>,
}

impl CollectingErrorHandler {
    pub fn new(ignore_errors: bool) -> CollectingErrorHandler {
        CollectingErrorHandler {
            ignore_errors,
            warnings: Vec::new(),
        }
    }

    pub fn warnings(&self) -> &[ParseWarning] {
        &self.warnings
    }
}

impl ErrorHandler for CollectingErrorHandler {
    fn handle(&mut self, warning: ParseWarning) -> Result<()> {
        if warning.must_throw || !self.ignore_errors {
            return Err(Error::invalid_encoding("csv row", warning.message));
        }
        log::debug!(
            "skipping malformed CSV row at bytes {}..{}: {}",
            warning.start_byte_offset,
            warning.end_byte_offset,
            warning.message
        );
        self.warnings.push(warning);
        Ok(())
    }
}
