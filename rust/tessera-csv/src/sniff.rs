//! Auto-detection drivers: dialect probing and header detection over a
//! sample prefix of the file.

use crate::driver::{CsvDriver, RowAction, ValueAction};

/// Coarse value classification used during sniffing. Real typing happens in
/// the binder; sniffing only needs enough to tell headers from data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SniffKind {
    Empty,
    Bool,
    Int,
    Float,
    String,
}

impl SniffKind {
    pub fn infer(value: &str) -> SniffKind {
        if value.is_empty() {
            SniffKind::Empty
        } else if value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false") {
            SniffKind::Bool
        } else if value.parse::<i64>().is_ok() {
            SniffKind::Int
        } else if value.parse::<f64>().is_ok() {
            SniffKind::Float
        } else {
            SniffKind::String
        }
    }

    /// Narrowest kind that accommodates both operands.
    pub fn combine(self, other: SniffKind) -> SniffKind {
        use SniffKind::*;
        match (self, other) {
            (Empty, k) | (k, Empty) => k,
            (a, b) if a == b => a,
            (Int, Float) | (Float, Int) => Float,
            _ => String,
        }
    }
}

/// Collects per-row column counts and quote/escape usage over the sample,
/// absorbing malformed rows into an error latch instead of reporting them.
pub struct DialectSniffDriver {
    sample_size: u64,
    column_counts: Vec<u64>,
    current_columns: u64,
    result_pos: usize,
    ever_quoted: bool,
    ever_escaped: bool,
    error: bool,
}

impl DialectSniffDriver {
    pub fn new(sample_size: u64) -> DialectSniffDriver {
        DialectSniffDriver {
            sample_size,
            column_counts: vec![0; sample_size as usize],
            current_columns: 0,
            result_pos: 0,
            ever_quoted: false,
            ever_escaped: false,
            error: false,
        }
    }

    pub fn ever_quoted(&self) -> bool {
        self.ever_quoted
    }

    pub fn ever_escaped(&self) -> bool {
        self.ever_escaped
    }

    /// The column count all sampled rows agree on, if the dialect parsed
    /// cleanly.
    pub fn consistent_column_count(&self) -> Option<u64> {
        if self.error || self.result_pos == 0 {
            return None;
        }
        let counts = &self.column_counts[..self.result_pos];
        counts
            .iter()
            .all(|&c| c == counts[0])
            .then_some(counts[0])
    }

    pub fn reset(&mut self) {
        *self = DialectSniffDriver::new(self.sample_size);
    }
}

impl CsvDriver for DialectSniffDriver {
    fn add_value(&mut self, _row: u64, _column: usize, _value: &str) -> ValueAction {
        self.current_columns += 1;
        ValueAction::Keep
    }

    fn add_row(&mut self, _row: u64, _column_count: usize) -> RowAction {
        if self.result_pos < self.column_counts.len() {
            self.column_counts[self.result_pos] = self.current_columns;
            self.result_pos += 1;
        }
        self.current_columns = 0;
        RowAction::Keep
    }

    fn done(&self, row_count: u64) -> bool {
        row_count >= self.sample_size
    }

    fn on_quote(&mut self) {
        self.ever_quoted = true;
    }

    fn on_escape(&mut self) {
        self.ever_escaped = true;
    }

    fn absorbs_errors(&self) -> bool {
        true
    }

    fn on_malformed(&mut self) {
        self.error = true;
    }
}

/// Collects column names and inferred kinds over a sample: the first row
/// supplies names when a header is declared, every other row narrows the
/// kind.
pub struct TypeSniffDriver {
    has_header: bool,
    sample_size: u64,
    columns: Vec<(String, SniffKind)>,
}

impl TypeSniffDriver {
    pub fn new(has_header: bool, sample_size: u64) -> TypeSniffDriver {
        TypeSniffDriver {
            has_header,
            sample_size,
            columns: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[(String, SniffKind)] {
        &self.columns
    }
}

impl CsvDriver for TypeSniffDriver {
    fn add_value(&mut self, row: u64, column: usize, value: &str) -> ValueAction {
        while self.columns.len() < column + 1 {
            let name = format!("column{}", self.columns.len());
            self.columns.push((name, SniffKind::Empty));
        }
        if row == 0 && self.has_header {
            self.columns[column].0 = value.to_string();
        } else {
            let kind = self.columns[column].1.combine(SniffKind::infer(value));
            self.columns[column].1 = kind;
        }
        ValueAction::Keep
    }

    fn add_row(&mut self, _row: u64, _column_count: usize) -> RowAction {
        RowAction::Keep
    }

    fn done(&self, row_count: u64) -> bool {
        u64::from(self.has_header) + self.sample_size <= row_count
    }

    fn absorbs_errors(&self) -> bool {
        true
    }
}

/// Inspects the first row against kinds sniffed from the body: any value
/// that reads as a string where the body is typed marks the row as a
/// header.
pub struct HeaderSniffDriver {
    expected: Vec<SniffKind>,
    header: Vec<(String, SniffKind)>,
    detected_header: bool,
}

impl HeaderSniffDriver {
    pub fn new(expected: Vec<SniffKind>) -> HeaderSniffDriver {
        HeaderSniffDriver {
            expected,
            header: Vec::new(),
            detected_header: false,
        }
    }

    pub fn detected_header(&self) -> bool {
        self.detected_header
    }

    pub fn header(&self) -> &[(String, SniffKind)] {
        &self.header
    }
}

impl CsvDriver for HeaderSniffDriver {
    fn add_value(&mut self, _row: u64, column: usize, value: &str) -> ValueAction {
        let kind = SniffKind::infer(value);
        self.header.push((value.to_string(), kind));
        if self.detected_header {
            return ValueAction::Keep;
        }
        if kind == SniffKind::String
            && column < self.expected.len()
            && !matches!(self.expected[column], SniffKind::String | SniffKind::Empty)
        {
            self.detected_header = true;
        }
        ValueAction::Keep
    }

    fn add_row(&mut self, _row: u64, _column_count: usize) -> RowAction {
        RowAction::Keep
    }

    fn done(&self, _row_count: u64) -> bool {
        true
    }

    fn absorbs_errors(&self) -> bool {
        true
    }
}
