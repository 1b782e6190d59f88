//! The buffered CSV reader and its character-driven state machine.
//!
//! The goto-based machine of the classic implementations is rendered as an
//! explicit state enum consumed by a loop; each state inspects the current
//! byte and yields the next state. Buffering guarantees that a value in
//! progress never moves: when a value straddles the buffer end, the
//! unconsumed remainder is copied to the front of a fresh (doubled if
//! needed) buffer before more bytes are read.

use tessera_common::Result;

use crate::{
    driver::{CsvDriver, RowAction, ValueAction},
    error::{ErrorHandler, ParseWarning},
    options::CsvOptions,
    source::ByteSource,
};

const INITIAL_BUFFER_SIZE: usize = 16 * 1024;

#[inline]
fn is_newline(c: u8) -> bool {
    c == b'\n' || c == b'\r'
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ValueStart,
    Normal,
    InQuotes,
    Unquote,
    HandleEscape,
    AddValue,
    AddRow,
    CarriageReturn,
    FinalState,
    IgnoreError,
}

/// Buffered reader over one CSV byte source.
///
/// A monotonic file offset is maintained so every row and value can be
/// attributed to an absolute byte range for diagnostics, even after the
/// parse buffer has been discarded.
pub struct CsvReader<S: ByteSource> {
    source: S,
    pub options: CsvOptions,
    file_idx: u32,
    buffer: Vec<u8>,
    buffer_size: usize,
    position: usize,
    os_file_offset: u64,
    block_idx: u64,
    rows_in_block: u64,
    cur_row: u64,
    num_errors: u64,
    line_start: u64,
    line_end: u64,
    line_complete: bool,
    /// Parallel scans stop at the first row boundary past this offset.
    scan_end: Option<u64>,
    /// Quoted newlines are legal in serial scans only.
    allow_quoted_newlines: bool,
}

impl<S: ByteSource> CsvReader<S> {
    pub fn new(source: S, options: CsvOptions, file_idx: u32) -> CsvReader<S> {
        CsvReader {
            source,
            options,
            file_idx,
            buffer: Vec::new(),
            buffer_size: 0,
            position: 0,
            os_file_offset: 0,
            block_idx: 0,
            rows_in_block: 0,
            cur_row: 0,
            num_errors: 0,
            line_start: 0,
            line_end: 0,
            line_complete: false,
            scan_end: None,
            allow_quoted_newlines: true,
        }
    }

    /// Absolute file offset of the byte at the current parse position.
    pub fn file_offset(&self) -> u64 {
        debug_assert!(self.os_file_offset >= self.buffer_size as u64);
        self.os_file_offset - self.buffer_size as u64 + self.position as u64
    }

    pub fn is_eof(&self) -> bool {
        self.file_offset() >= self.source.size()
    }

    pub fn source_size(&self) -> u64 {
        self.source.size()
    }

    pub(crate) fn set_scan_end(&mut self, end: Option<u64>) {
        self.scan_end = end;
    }

    pub(crate) fn set_allow_quoted_newlines(&mut self, allow: bool) {
        self.allow_quoted_newlines = allow;
    }

    pub(crate) fn seek_to(&mut self, offset: u64) -> Result<()> {
        self.source.seek_to(offset)?;
        self.buffer_size = 0;
        self.position = 0;
        self.os_file_offset = offset;
        Ok(())
    }

    /// Completed-parse accounting for row attribution across parse calls.
    pub(crate) fn finish_parse(&mut self) {
        self.rows_in_block += self.cur_row + self.num_errors;
    }

    /// Consumes a UTF-8 byte-order mark if the file starts with one.
    pub fn read_bom(&mut self) -> Result<()> {
        if !self.maybe_read_buffer(None)? {
            return Ok(());
        }
        if self.buffer_size >= 3 && self.buffer[..3] == [0xef, 0xbb, 0xbf] {
            self.position = 3;
        }
        Ok(())
    }

    /// Re-reads the recorded byte range of a row for diagnostics. Returns an
    /// empty string when the source cannot seek (e.g. under a decompression
    /// layer).
    pub fn reconstruct_line(&mut self, start: u64, end: u64, complete: bool) -> String {
        debug_assert!(end >= start);
        if !self.source.can_seek() {
            return String::new();
        }
        let mut bytes = vec![0u8; (end - start) as usize];
        match self.source.read_at(start, &mut bytes) {
            Ok(n) => bytes.truncate(n),
            Err(_) => return String::new(),
        }
        let mut line = String::from_utf8_lossy(&bytes).into_owned();
        if !complete {
            line.push_str("...");
        }
        line.trim_matches(['\r', '\n']).to_string()
    }

    fn read_buffer(&mut self, start: Option<&mut usize>) -> Result<bool> {
        // Bytes of the value in progress that must survive the refill.
        let remaining = match &start {
            Some(start) => {
                debug_assert!(**start <= self.buffer_size);
                self.buffer_size - **start
            }
            None => 0,
        };

        let mut read_size = INITIAL_BUFFER_SIZE;
        while remaining > read_size {
            read_size *= 2;
        }

        let mut buffer = vec![0u8; read_size + remaining];
        if let Some(start) = &start {
            buffer[..remaining].copy_from_slice(&self.buffer[**start..self.buffer_size]);
        }
        let read_count = self.source.read(&mut buffer[remaining..])?;
        self.buffer = buffer;
        self.buffer_size = remaining + read_count;
        self.os_file_offset += read_count as u64;
        if let Some(start) = start {
            *start = 0;
        }
        self.position = remaining;
        self.block_idx += 1;
        Ok(read_count > 0)
    }

    fn maybe_read_buffer(&mut self, start: Option<&mut usize>) -> Result<bool> {
        if self.position >= self.buffer_size {
            return self.read_buffer(start);
        }
        Ok(true)
    }

    /// Advances past exactly one line ending (`\n`, `\r` or `\r\n`),
    /// scanning from the current position. Used to land on the first row
    /// boundary inside a parallel block.
    pub(crate) fn skip_partial_line(&mut self) -> Result<()> {
        loop {
            while self.position < self.buffer_size {
                match self.buffer[self.position] {
                    b'\r' => {
                        self.position += 1;
                        if self.maybe_read_buffer(None)?
                            && self.position < self.buffer_size
                            && self.buffer[self.position] == b'\n'
                        {
                            self.position += 1;
                        }
                        return Ok(());
                    }
                    b'\n' => {
                        self.position += 1;
                        return Ok(());
                    }
                    _ => self.position += 1,
                }
            }
            if !self.read_buffer(None)? {
                return Ok(());
            }
        }
    }

    /// Advances past the remainder of the current line, including the
    /// newline run that ends it.
    fn skip_current_line(&mut self) -> Result<()> {
        loop {
            while self.position < self.buffer_size {
                if is_newline(self.buffer[self.position]) {
                    while self.position < self.buffer_size && is_newline(self.buffer[self.position])
                    {
                        self.position += 1;
                    }
                    return Ok(());
                }
                self.position += 1;
            }
            if !self.maybe_read_buffer(None)? {
                return Ok(());
            }
        }
    }

    fn handle_parse_error(
        &mut self,
        message: &str,
        must_throw: bool,
        handler: &mut dyn ErrorHandler,
    ) -> Result<()> {
        let end_byte_offset = if self.line_complete {
            self.line_end
        } else {
            self.file_offset()
        };
        handler.handle(ParseWarning {
            message: message.to_string(),
            start_byte_offset: self.line_start,
            end_byte_offset,
            block_idx: self.block_idx,
            row_offset_in_block: self.rows_in_block + self.cur_row + self.num_errors,
            file_idx: self.file_idx,
            complete_line: self.line_complete,
            must_throw,
        })?;
        self.num_errors += 1;
        Ok(())
    }

    /// Hands the value ending at the current position to the driver, after
    /// escape removal and UTF-8 validation. Returns `Ok(false)` when the row
    /// must be abandoned.
    fn emit_value(
        &mut self,
        driver: &mut dyn CsvDriver,
        column: usize,
        start: usize,
        has_quotes: bool,
        escapes: &mut Vec<usize>,
        handler: &mut dyn ErrorHandler,
    ) -> Result<bool> {
        let end = self.position - has_quotes as usize;
        let row = self.cur_row;
        let (action, invalid_utf8) = {
            let bytes = &self.buffer[start..end];
            if escapes.is_empty() {
                match std::str::from_utf8(bytes) {
                    Ok(value) => (Some(driver.add_value(row, column, value)), false),
                    Err(_) => (None, true),
                }
            } else {
                // Strip the escape characters recorded by the tokenizer.
                let mut unescaped = Vec::with_capacity(bytes.len());
                let mut prev = 0;
                for &escape_pos in escapes.iter() {
                    unescaped.extend_from_slice(&bytes[prev..escape_pos]);
                    prev = escape_pos + 1;
                }
                unescaped.extend_from_slice(&bytes[prev..]);
                match String::from_utf8(unescaped) {
                    Ok(value) => (Some(driver.add_value(row, column, &value)), false),
                    Err(_) => (None, true),
                }
            }
        };
        escapes.clear();
        if invalid_utf8 {
            self.handle_parse_error("Invalid UTF8-encoded string.", true, handler)?;
            return Ok(false);
        }
        match action.unwrap() {
            ValueAction::Keep => Ok(true),
            ValueAction::Error(message) => {
                if driver.absorbs_errors() {
                    driver.on_malformed();
                } else {
                    self.handle_parse_error(&message, false, handler)?;
                }
                Ok(false)
            }
        }
    }

    fn report_or_absorb(
        &mut self,
        driver: &mut dyn CsvDriver,
        message: &str,
        handler: &mut dyn ErrorHandler,
    ) -> Result<()> {
        if driver.absorbs_errors() {
            driver.on_malformed();
            Ok(())
        } else {
            self.handle_parse_error(message, false, handler)
        }
    }

    fn handle_row_action(
        &mut self,
        driver: &mut dyn CsvDriver,
        action: RowAction,
        handler: &mut dyn ErrorHandler,
    ) -> Result<()> {
        match action {
            RowAction::Keep => {
                self.cur_row += 1;
                Ok(())
            }
            RowAction::Drop => Ok(()),
            RowAction::Error(message) => self.report_or_absorb(driver, &message, handler),
        }
    }

    fn parse_done(&self, driver: &dyn CsvDriver) -> bool {
        // The scan-range check is strict: a row starting exactly at the
        // range end belongs to this scan, so stop only once at least one
        // byte of the next block has been consumed.
        driver.done(self.cur_row)
            || self
                .scan_end
                .is_some_and(|end| self.file_offset() > end)
    }

    /// Runs the tokenizer until the driver is done, the scan range ends, or
    /// the file is exhausted. Returns `(rows_read, rows_errored)`.
    pub fn parse_csv(
        &mut self,
        driver: &mut dyn CsvDriver,
        handler: &mut dyn ErrorHandler,
    ) -> Result<(u64, u64)> {
        self.cur_row = 0;
        self.num_errors = 0;
        let quote = self.options.quote;
        let escape = self.options.escape;
        let delimiter = self.options.delimiter;

        'record: loop {
            let mut column: usize = 0;
            let mut start = self.position;
            let mut has_quotes = false;
            let mut escapes: Vec<usize> = Vec::new();
            self.line_start = self.file_offset();
            self.line_complete = false;

            if !self.maybe_read_buffer(Some(&mut start))? {
                return Ok((self.cur_row, self.num_errors));
            }

            let mut state = State::ValueStart;
            loop {
                match state {
                    State::ValueStart => {
                        if self.buffer[self.position] == quote {
                            // The actual value starts past the quote.
                            start = self.position + 1;
                            has_quotes = true;
                            state = State::InQuotes;
                        } else {
                            start = self.position;
                            has_quotes = false;
                            state = State::Normal;
                        }
                    }
                    State::Normal => loop {
                        if self.position < self.buffer_size {
                            let c = self.buffer[self.position];
                            if c == delimiter {
                                state = State::AddValue;
                                break;
                            }
                            if is_newline(c) {
                                state = State::AddRow;
                                break;
                            }
                            self.position += 1;
                        } else if !self.read_buffer(Some(&mut start))? {
                            state = State::FinalState;
                            break;
                        }
                    },
                    State::InQuotes => {
                        driver.on_quote();
                        self.position += 1;
                        loop {
                            if self.position < self.buffer_size {
                                let c = self.buffer[self.position];
                                if c == quote {
                                    state = State::Unquote;
                                    break;
                                }
                                if escape != 0 && c == escape {
                                    escapes.push(self.position - start);
                                    state = State::HandleEscape;
                                    break;
                                }
                                if is_newline(c) && !self.allow_quoted_newlines {
                                    self.report_or_absorb(
                                        driver,
                                        "quoted newlines are not supported in parallel CSV \
                                         reading.",
                                        handler,
                                    )?;
                                    state = State::IgnoreError;
                                    break;
                                }
                                self.position += 1;
                            } else if !self.read_buffer(Some(&mut start))? {
                                // Still quoted when the file ends.
                                self.line_end = self.file_offset();
                                self.line_complete = true;
                                self.report_or_absorb(driver, "unterminated quotes.", handler)?;
                                state = State::IgnoreError;
                                break;
                            }
                        }
                    }
                    State::Unquote => {
                        // Either another quote (escaped quote) or the end of
                        // the value/row must follow.
                        self.position += 1;
                        if !self.maybe_read_buffer(Some(&mut start))? {
                            state = State::FinalState;
                            continue;
                        }
                        let c = self.buffer[self.position];
                        if c == quote && (escape == 0 || escape == quote) {
                            driver.on_escape();
                            escapes.push(self.position - start);
                            state = State::InQuotes;
                        } else if c == delimiter {
                            state = State::AddValue;
                        } else if is_newline(c) {
                            state = State::AddRow;
                        } else {
                            self.report_or_absorb(
                                driver,
                                "quote should be followed by end of file, end of value, end of \
                                 row or another quote.",
                                handler,
                            )?;
                            state = State::IgnoreError;
                        }
                    }
                    State::HandleEscape => {
                        self.position += 1;
                        if !self.maybe_read_buffer(Some(&mut start))? {
                            self.line_end = self.file_offset();
                            self.line_complete = true;
                            self.report_or_absorb(driver, "escape at end of file.", handler)?;
                            state = State::IgnoreError;
                            continue;
                        }
                        let c = self.buffer[self.position];
                        if c != quote && c != escape {
                            self.position += 1; // consume the invalid char
                            self.report_or_absorb(
                                driver,
                                "neither QUOTE nor ESCAPE is proceeded by ESCAPE.",
                                handler,
                            )?;
                            state = State::IgnoreError;
                        } else {
                            driver.on_escape();
                            state = State::InQuotes;
                        }
                    }
                    State::AddValue => {
                        if !self.emit_value(driver, column, start, has_quotes, &mut escapes, handler)?
                        {
                            state = State::IgnoreError;
                            continue;
                        }
                        column += 1;
                        self.position += 1;
                        start = self.position;
                        if !self.maybe_read_buffer(Some(&mut start))? {
                            state = State::FinalState;
                        } else {
                            state = State::ValueStart;
                        }
                    }
                    State::AddRow => {
                        self.line_end = self.file_offset();
                        self.line_complete = true;
                        let is_carriage_return = self.buffer[self.position] == b'\r';
                        if !self.emit_value(driver, column, start, has_quotes, &mut escapes, handler)?
                        {
                            state = State::IgnoreError;
                            continue;
                        }
                        column += 1;
                        let action = driver.add_row(self.cur_row, column);
                        self.handle_row_action(driver, action, handler)?;
                        column = 0;
                        self.position += 1;
                        start = self.position;
                        self.line_start = self.file_offset();
                        self.line_complete = false;
                        if !self.maybe_read_buffer(Some(&mut start))? {
                            return Ok((self.cur_row, self.num_errors));
                        }
                        if is_carriage_return {
                            state = State::CarriageReturn;
                        } else {
                            if self.parse_done(driver) {
                                return Ok((self.cur_row, self.num_errors));
                            }
                            state = State::ValueStart;
                        }
                    }
                    State::CarriageReturn => {
                        // Fold an optional \n after \r into one line break.
                        if self.buffer[self.position] == b'\n' {
                            self.position += 1;
                            start = self.position;
                            if !self.maybe_read_buffer(Some(&mut start))? {
                                return Ok((self.cur_row, self.num_errors));
                            }
                        }
                        if self.parse_done(driver) {
                            return Ok((self.cur_row, self.num_errors));
                        }
                        state = State::ValueStart;
                    }
                    State::FinalState => {
                        // The file ended; flush any value and row in
                        // progress.
                        self.line_end = self.file_offset();
                        self.line_complete = true;
                        if self.position > start {
                            if !self.emit_value(
                                driver,
                                column,
                                start,
                                has_quotes,
                                &mut escapes,
                                handler,
                            )? {
                                return Ok((self.cur_row, self.num_errors));
                            }
                            column += 1;
                        }
                        if column > 0 {
                            let action = driver.add_row(self.cur_row, column);
                            self.handle_row_action(driver, action, handler)?;
                        }
                        return Ok((self.cur_row, self.num_errors));
                    }
                    State::IgnoreError => {
                        // Skip to the next line start and restart the
                        // machine.
                        self.skip_current_line()?;
                        if self.parse_done(driver) {
                            return Ok((self.cur_row, self.num_errors));
                        }
                        continue 'record;
                    }
                }
            }
        }
    }
}
