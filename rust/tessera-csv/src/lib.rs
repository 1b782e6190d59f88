//! CSV ingestion: a buffered, error-recovering tokenizer with pluggable
//! parse drivers, serial and block-parallel scan fronts, and auto-detection
//! sniffers.

pub mod driver;
pub mod error;
pub mod options;
pub mod parallel;
pub mod reader;
pub mod serial;
pub mod sniff;
pub mod source;

pub use driver::{CsvDriver, StringBatch};
pub use error::{CollectingErrorHandler, ErrorHandler, ParseWarning};
pub use options::CsvOptions;
pub use parallel::ParallelCsvReader;
pub use reader::CsvReader;
pub use serial::SerialCsvReader;
pub use source::{ByteSource, FileSource, MemorySource};
