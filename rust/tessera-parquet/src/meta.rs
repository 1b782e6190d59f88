//! The pre-parsed Parquet metadata surface consumed by the column readers.
//!
//! Thrift decoding happens outside this crate; readers only interpret the
//! resulting struct fields, mirroring the footer and page-header shapes they
//! originate from.

use std::collections::VecDeque;

use tessera_common::Result;

/// Page kinds as they appear in the chunk's page stream. Index pages and any
/// future extensions are skipped by the readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    DataPage,
    DataPageV2,
    DictionaryPage,
    IndexPage,
}

/// Value encodings a page can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageEncoding {
    Plain,
    PlainDictionary,
    Rle,
    RleDictionary,
    DeltaBinaryPacked,
    DeltaLengthByteArray,
    DeltaByteArray,
    ByteStreamSplit,
}

/// Physical (storage) types of a column chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicalType {
    Boolean,
    Int32,
    Int64,
    Int96,
    Float,
    Double,
    ByteArray,
    FixedLenByteArray,
}

/// Compression codec declared by a column chunk.
///
/// `Lzo` and the deprecated framed `Lz4` are recognized but not implemented;
/// dispatching on them raises an unsupported-codec error naming the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionCodec {
    Uncompressed,
    Snappy,
    Gzip,
    Lzo,
    Brotli,
    Lz4,
    Zstd,
    Lz4Raw,
}

impl CompressionCodec {
    pub fn name(&self) -> &'static str {
        match self {
            CompressionCodec::Uncompressed => "UNCOMPRESSED",
            CompressionCodec::Snappy => "SNAPPY",
            CompressionCodec::Gzip => "GZIP",
            CompressionCodec::Lzo => "LZO",
            CompressionCodec::Brotli => "BROTLI",
            CompressionCodec::Lz4 => "LZ4",
            CompressionCodec::Zstd => "ZSTD",
            CompressionCodec::Lz4Raw => "LZ4_RAW",
        }
    }
}

/// Timestamp unit from the logical-type annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampUnit {
    Millis,
    Micros,
    Nanos,
}

/// Legacy "converted type" annotation, kept only as far as the readers
/// interpret it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvertedType {
    TimestampMillis,
    TimestampMicros,
    Decimal,
    Other(String),
}

/// Header of a V1 data page.
#[derive(Debug, Clone)]
pub struct DataPageHeader {
    pub num_values: u64,
    pub encoding: PageEncoding,
}

/// Header of a V2 data page. Repetition and definition levels are stored
/// uncompressed at the front of the page body even when the rest of the page
/// is compressed.
#[derive(Debug, Clone)]
pub struct DataPageHeaderV2 {
    pub num_values: u64,
    pub num_nulls: u64,
    pub num_rows: u64,
    pub encoding: PageEncoding,
    pub definition_levels_byte_length: u32,
    pub repetition_levels_byte_length: u32,
    pub is_compressed: bool,
}

/// Header of a dictionary page.
#[derive(Debug, Clone)]
pub struct DictionaryPageHeader {
    pub num_values: u64,
    pub encoding: PageEncoding,
}

/// A page header as delivered by the (external) Thrift layer.
#[derive(Debug, Clone)]
pub struct PageHeader {
    pub page_type: PageType,
    pub uncompressed_page_size: u64,
    pub compressed_page_size: u64,
    pub data_header: Option<DataPageHeader>,
    pub data_header_v2: Option<DataPageHeaderV2>,
    pub dictionary_header: Option<DictionaryPageHeader>,
}

/// Column-chunk metadata from the row-group footer.
#[derive(Debug, Clone)]
pub struct ColumnChunkMeta {
    pub num_values: u64,
    pub data_page_offset: u64,
    pub dictionary_page_offset: Option<u64>,
    pub total_compressed_size: u64,
    pub codec: CompressionCodec,
}

impl ColumnChunkMeta {
    /// Returns the file offset where the chunk's page stream begins.
    ///
    /// Some writers record a dictionary page offset that is absent or wrong;
    /// it is trusted only when present and at least 4 (past any magic bytes),
    /// and data pages are assumed to follow the dictionary directly.
    pub fn start_offset(&self) -> u64 {
        match self.dictionary_page_offset {
            Some(offset) if offset >= 4 => offset,
            _ => self.data_page_offset,
        }
    }
}

/// Per-column schema information the readers need: the physical type, the
/// Dremel level bounds, and the annotations that pick a value conversion.
#[derive(Debug, Clone)]
pub struct ColumnDescriptor {
    pub physical_type: PhysicalType,
    /// Declared byte length for `FixedLenByteArray` columns, 0 otherwise.
    pub type_length: usize,
    pub max_define: u32,
    pub max_repeat: u32,
    pub logical_timestamp: Option<TimestampUnit>,
    pub converted_type: Option<ConvertedType>,
}

impl ColumnDescriptor {
    pub fn new(physical_type: PhysicalType, max_define: u32, max_repeat: u32) -> ColumnDescriptor {
        ColumnDescriptor {
            physical_type,
            type_length: 0,
            max_define,
            max_repeat,
            logical_timestamp: None,
            converted_type: None,
        }
    }

    pub fn with_type_length(mut self, type_length: usize) -> ColumnDescriptor {
        self.type_length = type_length;
        self
    }

    pub fn with_logical_timestamp(mut self, unit: TimestampUnit) -> ColumnDescriptor {
        self.logical_timestamp = Some(unit);
        self
    }

    pub fn with_converted_type(mut self, converted: ConvertedType) -> ColumnDescriptor {
        self.converted_type = Some(converted);
        self
    }

    pub fn has_defines(&self) -> bool {
        self.max_define > 0
    }

    pub fn has_repeats(&self) -> bool {
        self.max_repeat > 0
    }
}

/// Source of `(header, raw page body)` pairs for one column chunk, in chunk
/// order. The body is the on-disk form: compressed when the chunk codec says
/// so, except for V2 level bytes which are always raw.
pub trait PageSource {
    fn next_page(&mut self) -> Result<Option<(PageHeader, Vec<u8>)>>;
}

/// A `PageSource` over pre-materialized pages, used by tests and by callers
/// that stage chunk bytes themselves.
pub struct MemoryPageSource {
    pages: VecDeque<(PageHeader, Vec<u8>)>,
}

impl MemoryPageSource {
    pub fn new(pages: Vec<(PageHeader, Vec<u8>)>) -> MemoryPageSource {
        MemoryPageSource {
            pages: pages.into(),
        }
    }
}

impl PageSource for MemoryPageSource {
    fn next_page(&mut self) -> Result<Option<(PageHeader, Vec<u8>)>> {
        Ok(self.pages.pop_front())
    }
}
