//! Parse drivers: strategy objects plugged into the tokenizer that decide
//! what happens to each value and row.

use tessera_vector::{ColumnType, ColumnVector};

use crate::options::CsvOptions;

/// Driver verdict for one parsed value.
pub enum ValueAction {
    Keep,
    /// Reject the row with a recoverable parse error.
    Error(String),
}

/// Driver verdict for one completed row.
pub enum RowAction {
    /// Count the row and move on.
    Keep,
    /// Silently drop the row (blank lines).
    Drop,
    /// Report a recoverable parse error; the row is not counted.
    Error(String),
}

/// A strategy swapped into the tokenizer: skipping, header handling, real
/// ingestion, and the sniffers all implement this.
pub trait CsvDriver {
    fn add_value(&mut self, row: u64, column: usize, value: &str) -> ValueAction;
    fn add_row(&mut self, row: u64, column_count: usize) -> RowAction;
    fn done(&self, row_count: u64) -> bool;

    /// Called when a quoted section is entered.
    fn on_quote(&mut self) {}

    /// Called when an escape character is used correctly.
    fn on_escape(&mut self) {}

    /// Sniffing drivers latch malformed input instead of reporting it.
    fn absorbs_errors(&self) -> bool {
        false
    }

    /// Called instead of the error handler when `absorbs_errors` is set.
    fn on_malformed(&mut self) {}
}

/// Discards the first N rows of the file.
pub struct SkipRowDriver {
    pub skip_rows: u64,
}

impl CsvDriver for SkipRowDriver {
    fn add_value(&mut self, _row: u64, _column: usize, _value: &str) -> ValueAction {
        ValueAction::Keep
    }

    fn add_row(&mut self, _row: u64, _column_count: usize) -> RowAction {
        RowAction::Keep
    }

    fn done(&self, row_count: u64) -> bool {
        row_count >= self.skip_rows
    }
}

/// Consumes exactly one row (the header line).
pub struct HeaderDriver;

impl CsvDriver for HeaderDriver {
    fn add_value(&mut self, _row: u64, _column: usize, _value: &str) -> ValueAction {
        ValueAction::Keep
    }

    fn add_row(&mut self, _row: u64, _column_count: usize) -> RowAction {
        RowAction::Keep
    }

    fn done(&self, _row_count: u64) -> bool {
        true
    }
}

/// A batch of parsed rows: one `String`-typed column vector per source
/// column. Casting to typed columns is the binder's concern downstream.
pub struct StringBatch {
    columns: Vec<ColumnVector>,
    capacity: usize,
    rows: usize,
}

impl StringBatch {
    pub fn new(num_columns: usize, capacity: usize) -> StringBatch {
        StringBatch {
            columns: (0..num_columns)
                .map(|_| ColumnVector::new(ColumnType::String, capacity))
                .collect(),
            capacity,
            rows: 0,
        }
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Returns the value at `(row, column)`, or `None` for a null.
    pub fn value(&self, row: usize, column: usize) -> Option<&str> {
        let vector = &self.columns[column];
        if vector.is_null(row) {
            None
        } else {
            Some(vector.str_at(row))
        }
    }

    /// Clears the batch for reuse.
    pub fn reset(&mut self) {
        let (columns, capacity) = (self.columns.len(), self.capacity);
        *self = StringBatch::new(columns, capacity);
    }
}

/// The ingestion driver: lands validated values into a [`StringBatch`],
/// treating configured null markers as nulls and tolerating one trailing
/// delimiter per row.
pub struct ParsingDriver<'a> {
    batch: &'a mut StringBatch,
    options: &'a CsvOptions,
    row_empty: bool,
}

impl<'a> ParsingDriver<'a> {
    pub fn new(batch: &'a mut StringBatch, options: &'a CsvOptions) -> ParsingDriver<'a> {
        ParsingDriver {
            batch,
            options,
            row_empty: false,
        }
    }
}

impl CsvDriver for ParsingDriver<'_> {
    fn add_value(&mut self, row: u64, column: usize, value: &str) -> ValueAction {
        self.row_empty = value.is_empty() && column == 0;
        let num_columns = self.batch.num_columns();
        if column == num_columns && value.is_empty() {
            // A single trailing delimiter in the last column is tolerated.
            return ValueAction::Keep;
        }
        if column >= num_columns {
            return ValueAction::Error(format!(
                "expected {num_columns} values per row, but got more."
            ));
        }
        if self.options.is_null_string(value) {
            self.batch.columns[column].set_null(row as usize);
        } else {
            self.batch.columns[column].set_str(row as usize, value);
        }
        ValueAction::Keep
    }

    fn add_row(&mut self, _row: u64, column_count: usize) -> RowAction {
        let num_columns = self.batch.num_columns();
        if self.row_empty {
            self.row_empty = false;
            if num_columns != 1 {
                // A blank line is dropped, unless the single column reads
                // it as a null.
                return RowAction::Drop;
            }
        }
        if column_count < num_columns {
            return RowAction::Error(format!(
                "expected {num_columns} values per row, but got {column_count}."
            ));
        }
        self.batch.rows += 1;
        RowAction::Keep
    }

    fn done(&self, row_count: u64) -> bool {
        row_count >= self.batch.capacity() as u64
    }
}
