//! The per-column page state machine: pull a page, decompress it, decode its
//! levels, pick exactly one value decoder, and serve batched reads until the
//! page is drained.

use tessera_bytes::{ByteCursor, ByteVec};
use tessera_common::{Error, Result};
use tessera_vector::{ColumnType, ColumnVector};

use crate::{
    codec,
    convert::{Converter, PlainState},
    delta::DeltaBinaryPackedDecoder,
    meta::{
        ColumnChunkMeta, ColumnDescriptor, CompressionCodec, PageEncoding, PageHeader, PageSource,
        PageType, PhysicalType,
    },
    rle::RleBpDecoder,
};

/// Batch size used for internal scratch reads (skips, nested assembly).
pub(crate) const SCRATCH_BATCH: u64 = 2048;

/// Reader for one leaf column of one row group.
///
/// `read` produces values in file order into the caller's vector, writing
/// definition and repetition levels into the caller's level buffers so that
/// nested readers can reassemble list and struct structure on top.
pub struct ColumnReader {
    desc: ColumnDescriptor,
    chunk: ColumnChunkMeta,
    output_type: ColumnType,
    converter: Converter,
    source: Box<dyn PageSource>,
    group_rows_available: u64,
    page: Option<PageState>,
    dictionary: Option<ColumnVector>,
    spare_buf: Option<ByteVec>,
}

struct PageState {
    rows_available: u64,
    define: Option<LevelStream>,
    repeat: Option<LevelStream>,
    values: PageValues,
}

/// Definition or repetition levels of the current page, decoded in full when
/// the page is prepared.
struct LevelStream {
    levels: Vec<u8>,
    pos: usize,
}

/// Exactly one value decoder interprets a page for its whole lifetime.
enum PageValues {
    Plain(PlainState),
    Dictionary(RleBpDecoder),
    Delta(DeltaBinaryPackedDecoder),
    RleBool(RleBpDecoder),
}

impl PageValues {
    fn into_buffer(self) -> ByteVec {
        match self {
            PageValues::Plain(state) => state.into_buffer(),
            PageValues::Dictionary(decoder) => decoder.into_buffer(),
            PageValues::Delta(decoder) => decoder.into_buffer(),
            PageValues::RleBool(decoder) => decoder.into_buffer(),
        }
    }
}

impl ColumnReader {
    pub fn new(
        desc: ColumnDescriptor,
        chunk: ColumnChunkMeta,
        output_type: ColumnType,
        source: Box<dyn PageSource>,
    ) -> Result<ColumnReader> {
        let converter = Converter::from_descriptor(&desc, &output_type)?;
        let group_rows_available = chunk.num_values;
        Ok(ColumnReader {
            desc,
            chunk,
            output_type,
            converter,
            source,
            group_rows_available,
            page: None,
            dictionary: None,
            spare_buf: None,
        })
    }

    pub fn descriptor(&self) -> &ColumnDescriptor {
        &self.desc
    }

    pub fn output_type(&self) -> &ColumnType {
        &self.output_type
    }

    /// Number of leaf values (including nulls) left in the column chunk.
    pub fn values_remaining(&self) -> u64 {
        self.group_rows_available
    }

    /// Reads `count` values into `out` starting at `out_offset`, filling the
    /// level buffers at the same positions. Null slots consume one output
    /// position each without consuming payload bytes.
    ///
    /// `define_out` and `repeat_out` must hold at least `out_offset + count`
    /// entries.
    pub fn read(
        &mut self,
        count: u64,
        define_out: &mut [u8],
        repeat_out: &mut [u8],
        out: &mut ColumnVector,
        out_offset: usize,
    ) -> Result<u64> {
        let converter = self.converter;
        let max_define = self.desc.max_define as u8;
        let mut result_offset = out_offset;
        let mut to_read = count;
        while to_read > 0 {
            while self.page.as_ref().is_none_or(|p| p.rows_available == 0) {
                self.prepare_next_page()?;
            }
            let page = self.page.as_mut().unwrap();
            let read_now = to_read.min(page.rows_available) as usize;
            let range = result_offset..result_offset + read_now;

            if let Some(repeat) = &mut page.repeat {
                repeat_out[range.clone()]
                    .copy_from_slice(&repeat.levels[repeat.pos..repeat.pos + read_now]);
                repeat.pos += read_now;
            } else {
                repeat_out[range.clone()].fill(0);
            }
            if let Some(define) = &mut page.define {
                define_out[range.clone()]
                    .copy_from_slice(&define.levels[define.pos..define.pos + read_now]);
                define.pos += read_now;
            } else {
                define_out[range.clone()].fill(max_define);
            }

            // Dictionary offsets, delta streams and RLE payloads have no
            // entries for nulls; count them up front.
            let null_count = define_out[range.clone()]
                .iter()
                .filter(|&&d| d < max_define)
                .count();

            match &mut page.values {
                PageValues::Dictionary(decoder) => {
                    let mut indices = vec![0u32; read_now - null_count];
                    decoder.get_batch(&mut indices)?;
                    let dictionary = self.dictionary.as_ref().ok_or_else(|| {
                        Error::invalid_encoding("page", "dictionary-encoded page with no dictionary")
                    })?;
                    let mut next = 0usize;
                    for i in 0..read_now {
                        if define_out[result_offset + i] < max_define {
                            out.set_null(result_offset + i);
                            continue;
                        }
                        let index = indices[next] as usize;
                        next += 1;
                        if index >= dictionary.len() {
                            return Err(Error::invalid_encoding(
                                "page",
                                format!(
                                    "dictionary index {index} out of range ({} entries)",
                                    dictionary.len()
                                ),
                            ));
                        }
                        out.copy_value_from(result_offset + i, dictionary, index);
                    }
                }
                PageValues::Delta(decoder) => {
                    let mut decoded = vec![0i64; read_now - null_count];
                    decoder.get_batch(&mut decoded)?;
                    // Materialize the integers as a plain-encoded buffer and
                    // run the ordinary conversion over it, which also places
                    // the nulls.
                    let mut synth = ByteVec::with_capacity(decoded.len() * 8);
                    match self.desc.physical_type {
                        PhysicalType::Int32 => {
                            for v in &decoded {
                                synth.push_typed(*v as i32);
                            }
                        }
                        PhysicalType::Int64 => {
                            for v in &decoded {
                                synth.push_typed(*v);
                            }
                        }
                        other => {
                            return Err(Error::invalid_encoding(
                                "page",
                                format!("DELTA_BINARY_PACKED on {other:?} column"),
                            ));
                        }
                    }
                    let mut state = PlainState::new(synth, 0);
                    for i in 0..read_now {
                        if define_out[result_offset + i] < max_define {
                            out.set_null(result_offset + i);
                        } else {
                            converter.plain_read(&mut state, out, result_offset + i)?;
                        }
                    }
                }
                PageValues::RleBool(decoder) => {
                    let mut decoded = vec![0u8; read_now - null_count];
                    decoder.get_batch(&mut decoded)?;
                    let mut next = 0usize;
                    for i in 0..read_now {
                        if define_out[result_offset + i] < max_define {
                            out.set_null(result_offset + i);
                        } else {
                            out.set_value(result_offset + i, decoded[next] & 1);
                            next += 1;
                        }
                    }
                }
                PageValues::Plain(state) => {
                    for i in 0..read_now {
                        if define_out[result_offset + i] < max_define {
                            out.set_null(result_offset + i);
                        } else {
                            converter.plain_read(state, out, result_offset + i)?;
                        }
                    }
                }
            }

            page.rows_available -= read_now as u64;
            result_offset += read_now;
            to_read -= read_now as u64;
        }
        self.group_rows_available = self.group_rows_available.saturating_sub(count);
        Ok(count)
    }

    /// Skips `count` values by decoding them into scratch storage, so a
    /// subsequent read observes exactly the state a direct read would have.
    pub fn skip(&mut self, count: u64) -> Result<()> {
        let mut remaining = count;
        while remaining > 0 {
            let n = remaining.min(SCRATCH_BATCH);
            let mut scratch = ColumnVector::new(self.output_type.clone(), n as usize);
            let mut define = vec![0u8; n as usize];
            let mut repeat = vec![0u8; n as usize];
            self.read(n, &mut define, &mut repeat, &mut scratch, 0)?;
            remaining -= n;
        }
        Ok(())
    }

    fn prepare_next_page(&mut self) -> Result<()> {
        let Some((header, body)) = self.source.next_page()? else {
            return Err(Error::invalid_encoding(
                "column chunk",
                "page stream exhausted while rows were still expected",
            ));
        };
        match header.page_type {
            PageType::DataPage | PageType::DataPageV2 => {
                let block = self.decompress_page(&header, &body)?;
                self.prepare_data_page(&header, block)
            }
            PageType::DictionaryPage => {
                let block = self.decompress_page(&header, &body)?;
                self.decode_dictionary(&header, block)
            }
            PageType::IndexPage => {
                log::debug!("ignoring index page in column chunk");
                Ok(())
            }
        }
    }

    /// Produces the fully decompressed page body, reusing the decompression
    /// buffer across pages. For V2 pages the level bytes are copied out as-is
    /// before the codec runs on the remainder.
    fn decompress_page(&mut self, header: &PageHeader, body: &[u8]) -> Result<ByteVec> {
        let mut block = self.take_buffer();
        block.reset_to(header.uncompressed_page_size as usize);
        if header.page_type == PageType::DataPageV2 {
            let v2 = header.data_header_v2.as_ref().ok_or_else(|| {
                Error::invalid_encoding("page", "data page v2 without a v2 header")
            })?;
            let levels_len =
                (v2.repetition_levels_byte_length + v2.definition_levels_byte_length) as usize;
            let uncompressed =
                !v2.is_compressed || self.chunk.codec == CompressionCodec::Uncompressed;
            if uncompressed {
                codec::decompress(CompressionCodec::Uncompressed, body, block.as_mut_slice())?;
            } else {
                if body.len() < levels_len || block.len() < levels_len {
                    return Err(Error::out_of_buffer(levels_len, body.len().min(block.len())));
                }
                block.as_mut_slice()[..levels_len].copy_from_slice(&body[..levels_len]);
                codec::decompress(
                    self.chunk.codec,
                    &body[levels_len..],
                    &mut block.as_mut_slice()[levels_len..],
                )?;
            }
        } else {
            codec::decompress(self.chunk.codec, body, block.as_mut_slice())?;
        }
        Ok(block)
    }

    fn prepare_data_page(&mut self, header: &PageHeader, block: ByteVec) -> Result<()> {
        let (num_values, encoding) = match (&header.data_header, &header.data_header_v2) {
            (Some(v1), _) => (v1.num_values, v1.encoding),
            (_, Some(v2)) => (v2.num_values, v2.encoding),
            (None, None) => {
                return Err(Error::invalid_encoding("page", "data page without a header"));
            }
        };
        let is_v2 = header.page_type == PageType::DataPageV2;
        let v2_lengths = header
            .data_header_v2
            .as_ref()
            .map(|v2| {
                (
                    v2.repetition_levels_byte_length as usize,
                    v2.definition_levels_byte_length as usize,
                )
            })
            .unwrap_or((0, 0));

        let mut pos = 0usize;
        let mut repeat = None;
        if self.desc.has_repeats() {
            let section = Self::level_section(&block, &mut pos, is_v2, v2_lengths.0)?;
            let bit_width = RleBpDecoder::compute_bit_width(u64::from(self.desc.max_repeat));
            repeat = Some(LevelStream {
                levels: decode_levels(section, bit_width, num_values as usize)?,
                pos: 0,
            });
        } else if is_v2 && v2_lengths.0 > 0 {
            pos += v2_lengths.0;
        }

        let mut define = None;
        if self.desc.has_defines() {
            let section = Self::level_section(&block, &mut pos, is_v2, v2_lengths.1)?;
            let bit_width = RleBpDecoder::compute_bit_width(u64::from(self.desc.max_define));
            define = Some(LevelStream {
                levels: decode_levels(section, bit_width, num_values as usize)?,
                pos: 0,
            });
        } else if is_v2 && v2_lengths.1 > 0 {
            pos += v2_lengths.1;
        }

        let values = match encoding {
            PageEncoding::Plain => PageValues::Plain(PlainState::new(block, pos)),
            PageEncoding::RleDictionary | PageEncoding::PlainDictionary => {
                let mut cursor = ByteCursor::new(&block);
                cursor.skip(pos)?;
                let bit_width = cursor.read::<u8>()?;
                PageValues::Dictionary(RleBpDecoder::new(block, pos + 1, u32::from(bit_width))?)
            }
            PageEncoding::Rle => {
                if self.output_type != ColumnType::Bool {
                    return Err(Error::invalid_encoding(
                        "page",
                        "RLE encoding is only supported for boolean data",
                    ));
                }
                let mut cursor = ByteCursor::new(&block);
                cursor.skip(pos)?;
                cursor.skip(size_of::<u32>())?;
                PageValues::RleBool(RleBpDecoder::new(block, pos + size_of::<u32>(), 1)?)
            }
            PageEncoding::DeltaBinaryPacked => {
                if !matches!(
                    self.desc.physical_type,
                    PhysicalType::Int32 | PhysicalType::Int64
                ) {
                    return Err(Error::invalid_encoding(
                        "page",
                        "DELTA_BINARY_PACKED is only supported for INT32 and INT64",
                    ));
                }
                PageValues::Delta(DeltaBinaryPackedDecoder::new(block, pos)?)
            }
            PageEncoding::DeltaLengthByteArray | PageEncoding::DeltaByteArray => {
                return Err(Error::not_implemented(format!(
                    "page encoding {encoding:?}"
                )));
            }
            other => {
                return Err(Error::invalid_encoding(
                    "page",
                    format!("unsupported page encoding {other:?}"),
                ));
            }
        };

        self.page = Some(PageState {
            rows_available: num_values,
            define,
            repeat,
            values,
        });
        Ok(())
    }

    /// Returns the level byte section starting at `pos`, advancing `pos`
    /// past it. V1 pages carry a 4-byte length prefix; V2 lengths come from
    /// the page header.
    fn level_section<'a>(
        block: &'a ByteVec,
        pos: &mut usize,
        is_v2: bool,
        v2_len: usize,
    ) -> Result<&'a [u8]> {
        let mut cursor = ByteCursor::new(block);
        cursor.skip(*pos)?;
        let len = if is_v2 {
            v2_len
        } else {
            cursor.read::<u32>()? as usize
        };
        let section = cursor.read_slice(len)?;
        *pos = cursor.position();
        Ok(section)
    }

    /// Decodes a dictionary page into an in-memory dictionary vector of the
    /// column's output type; later index lookups copy values out of it. The
    /// dictionary is read-only for the remainder of the row group.
    fn decode_dictionary(&mut self, header: &PageHeader, block: ByteVec) -> Result<()> {
        let num_values = header
            .dictionary_header
            .as_ref()
            .ok_or_else(|| {
                Error::invalid_encoding("page", "dictionary page without a dictionary header")
            })?
            .num_values as usize;
        let mut dictionary = ColumnVector::new(self.output_type.clone(), num_values);
        let mut state = PlainState::new(block, 0);
        for i in 0..num_values {
            self.converter.plain_read(&mut state, &mut dictionary, i)?;
        }
        self.spare_buf = Some(state.into_buffer());
        self.dictionary = Some(dictionary);
        Ok(())
    }

    fn take_buffer(&mut self) -> ByteVec {
        if let Some(page) = self.page.take() {
            page.values.into_buffer()
        } else {
            self.spare_buf.take().unwrap_or_default()
        }
    }
}

fn decode_levels(section: &[u8], bit_width: u32, count: usize) -> Result<Vec<u8>> {
    let mut decoder = RleBpDecoder::new(ByteVec::copy_from_slice(section), 0, bit_width)?;
    let mut levels = vec![0u8; count];
    decoder.get_batch(&mut levels)?;
    Ok(levels)
}
