//! Page decompression, dispatched on the chunk's declared codec.
//!
//! All codecs decompress into a caller-provided destination slice already
//! sized to the page's declared uncompressed length; a result of any other
//! size is a hard error for the file, with no partial-page recovery.

use std::io::Read;

use tessera_common::{Error, Result};

use crate::meta::CompressionCodec;

/// Decompresses `src` into `dst`, which must be exactly the declared
/// uncompressed size of the page (or page remainder, for V2 pages whose
/// level bytes were copied out first).
pub fn decompress(codec: CompressionCodec, src: &[u8], dst: &mut [u8]) -> Result<()> {
    match codec {
        CompressionCodec::Uncompressed => {
            if src.len() != dst.len() {
                return Err(Error::invalid_encoding(
                    "page",
                    format!(
                        "compressed size {} does not match uncompressed size {} for an \
                         uncompressed page",
                        src.len(),
                        dst.len()
                    ),
                ));
            }
            dst.copy_from_slice(src);
            Ok(())
        }
        CompressionCodec::Gzip => {
            let mut decoder = flate2::read::MultiGzDecoder::new(src);
            read_exactly(&mut decoder, dst, "GZIP")
        }
        CompressionCodec::Snappy => {
            let declared = snap::raw::decompress_len(src)
                .map_err(|e| Error::invalid_encoding("page", format!("snappy: {e}")))?;
            if declared != dst.len() {
                return Err(Error::invalid_encoding(
                    "page",
                    "snappy decompression failure: uncompressed data size mismatch",
                ));
            }
            let written = snap::raw::Decoder::new()
                .decompress(src, dst)
                .map_err(|e| Error::invalid_encoding("page", format!("snappy: {e}")))?;
            if written != dst.len() {
                return Err(Error::invalid_encoding(
                    "page",
                    "snappy decompression failure: uncompressed data size mismatch",
                ));
            }
            Ok(())
        }
        CompressionCodec::Zstd => {
            let written = zstd::bulk::decompress_to_buffer(src, dst)
                .map_err(|e| Error::invalid_encoding("page", format!("zstd: {e}")))?;
            if written != dst.len() {
                return Err(Error::invalid_encoding(
                    "page",
                    "zstd decompression produced an unexpected size",
                ));
            }
            Ok(())
        }
        CompressionCodec::Brotli => {
            let mut decoder = brotli::Decompressor::new(src, 4096);
            read_exactly(&mut decoder, dst, "BROTLI")
        }
        CompressionCodec::Lz4Raw => {
            let written = lz4::block::decompress_to_buffer(src, Some(dst.len() as i32), dst)
                .map_err(|e| Error::invalid_encoding("page", format!("lz4: {e}")))?;
            if written != dst.len() {
                return Err(Error::invalid_encoding(
                    "page",
                    "lz4 decompression produced an unexpected size",
                ));
            }
            Ok(())
        }
        CompressionCodec::Lzo | CompressionCodec::Lz4 => Err(Error::unsupported_codec(codec.name())),
    }
}

/// Streams a decoder until `dst` is full, then verifies the stream ends.
fn read_exactly(reader: &mut impl Read, dst: &mut [u8], codec: &str) -> Result<()> {
    let mut filled = 0usize;
    while filled < dst.len() {
        let n = reader
            .read(&mut dst[filled..])
            .map_err(|e| Error::invalid_encoding("page", format!("{codec}: {e}")))?;
        if n == 0 {
            return Err(Error::invalid_encoding(
                "page",
                format!("{codec} stream ended after {filled} of {} bytes", dst.len()),
            ));
        }
        filled += n;
    }
    let mut probe = [0u8; 1];
    match reader.read(&mut probe) {
        Ok(0) => Ok(()),
        Ok(_) => Err(Error::invalid_encoding(
            "page",
            format!("{codec} stream longer than the declared uncompressed size"),
        )),
        Err(e) => Err(Error::invalid_encoding("page", format!("{codec}: {e}"))),
    }
}
