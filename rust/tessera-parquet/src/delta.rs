//! DELTA_BINARY_PACKED decoding for INT32/INT64 columns.
//!
//! The stream starts with a header of four ULEB128/zig-zag fields:
//! `(block_value_count, miniblocks_per_block, total_value_count,
//! first_value)`. Each block then carries a zig-zag `min_delta`, one
//! bit-width byte per miniblock, and the miniblocks' bit-packed deltas.
//! A value is reconstructed as `previous + min_delta + unpacked_delta`; the
//! very first output value is the header's literal value.

use tessera_bytes::{ByteCursor, ByteVec};
use tessera_common::{Error, Result, verify_data};

pub struct DeltaBinaryPackedDecoder {
    data: ByteVec,
    pos: usize,
    block_value_count: u64,
    miniblocks_per_block: u64,
    values_per_miniblock: u64,
    total_value_count: u64,
    values_read: u64,
    last_value: i64,
    first_value: i64,
    is_first_value: bool,
    min_delta: i64,
    bit_widths: Vec<u8>,
    miniblock_idx: u64,
    values_left_in_miniblock: u64,
    miniblock_bit_pos: usize,
    current_bit_width: u32,
}

impl DeltaBinaryPackedDecoder {
    pub fn new(data: ByteVec, start: usize) -> Result<DeltaBinaryPackedDecoder> {
        let mut cursor = ByteCursor::new(&data);
        cursor.skip(start)?;
        let block_value_count = cursor.read_uleb128()?;
        let miniblocks_per_block = cursor.read_uleb128()?;
        let total_value_count = cursor.read_uleb128()?;
        let first_value = cursor.read_zigzag()?;
        verify_data!("delta stream", miniblocks_per_block > 0);
        verify_data!("delta stream", block_value_count % miniblocks_per_block == 0);
        let values_per_miniblock = block_value_count / miniblocks_per_block;
        verify_data!("delta stream", values_per_miniblock % 8 == 0);
        let pos = cursor.position();
        Ok(DeltaBinaryPackedDecoder {
            data,
            pos,
            block_value_count,
            miniblocks_per_block,
            values_per_miniblock,
            total_value_count,
            values_read: 0,
            last_value: first_value,
            first_value,
            is_first_value: true,
            min_delta: 0,
            bit_widths: Vec::new(),
            // Start exhausted so the first non-header value pulls a block.
            miniblock_idx: 0,
            values_left_in_miniblock: 0,
            miniblock_bit_pos: 0,
            current_bit_width: 0,
        })
    }

    /// Total number of values the stream declares, including the header's
    /// first value.
    pub fn total_value_count(&self) -> u64 {
        self.total_value_count
    }

    /// Fills `out` completely, failing if it asks for more values than the
    /// stream declares.
    pub fn get_batch(&mut self, out: &mut [i64]) -> Result<()> {
        if out.len() as u64 > self.total_value_count - self.values_read {
            return Err(Error::invalid_encoding(
                "delta stream",
                format!(
                    "batch of {} values requested with {} remaining",
                    out.len(),
                    self.total_value_count - self.values_read
                ),
            ));
        }
        for slot in out.iter_mut() {
            if self.is_first_value {
                self.is_first_value = false;
                self.values_read += 1;
                *slot = self.first_value;
                continue;
            }
            if self.values_left_in_miniblock == 0 {
                self.advance_miniblock()?;
            }
            let delta = self.read_packed_delta();
            self.values_left_in_miniblock -= 1;
            self.last_value = self
                .last_value
                .wrapping_add(self.min_delta)
                .wrapping_add(delta);
            self.values_read += 1;
            *slot = self.last_value;
        }
        Ok(())
    }

    fn advance_miniblock(&mut self) -> Result<()> {
        if self.miniblock_idx == 0 || self.miniblock_idx == self.miniblocks_per_block {
            self.read_block_header()?;
        }
        let width = u32::from(self.bit_widths[self.miniblock_idx as usize]);
        verify_data!("delta stream", width <= 64);
        // Miniblocks are stored in full even when the tail is unused.
        let byte_len = (self.values_per_miniblock as usize) * width as usize / 8;
        let mut cursor = ByteCursor::new(&self.data);
        cursor.skip(self.pos)?;
        cursor.available(byte_len)?;
        self.current_bit_width = width;
        self.miniblock_bit_pos = self.pos * 8;
        self.pos += byte_len;
        self.miniblock_idx += 1;
        self.values_left_in_miniblock = self.values_per_miniblock;
        Ok(())
    }

    fn read_block_header(&mut self) -> Result<()> {
        let mut cursor = ByteCursor::new(&self.data);
        cursor.skip(self.pos)?;
        self.min_delta = cursor.read_zigzag()?;
        let widths = cursor.read_slice(self.miniblocks_per_block as usize)?;
        self.bit_widths = widths.to_vec();
        self.pos = cursor.position();
        self.miniblock_idx = 0;
        Ok(())
    }

    #[inline]
    fn read_packed_delta(&mut self) -> i64 {
        let mut value = 0u64;
        for bit in 0..self.current_bit_width as usize {
            let index = self.miniblock_bit_pos + bit;
            value |= u64::from((self.data[index / 8] >> (index % 8)) & 1) << bit;
        }
        self.miniblock_bit_pos += self.current_bit_width as usize;
        value as i64
    }

    /// Returns the backing buffer for reuse by the next page.
    pub fn into_buffer(self) -> ByteVec {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK: usize = 128;
    const MINIBLOCKS: usize = 4;

    fn push_uleb(out: &mut Vec<u8>, mut v: u64) {
        loop {
            let byte = (v & 0x7f) as u8;
            v >>= 7;
            if v == 0 {
                out.push(byte);
                break;
            }
            out.push(byte | 0x80);
        }
    }

    fn push_zigzag(out: &mut Vec<u8>, v: i64) {
        push_uleb(out, ((v << 1) ^ (v >> 63)) as u64);
    }

    /// Reference encoder with a 128-value block of four miniblocks.
    pub(crate) fn encode(values: &[i64]) -> Vec<u8> {
        assert!(!values.is_empty());
        let mut out = Vec::new();
        push_uleb(&mut out, BLOCK as u64);
        push_uleb(&mut out, MINIBLOCKS as u64);
        push_uleb(&mut out, values.len() as u64);
        push_zigzag(&mut out, values[0]);

        let deltas: Vec<i64> = values.windows(2).map(|w| w[1].wrapping_sub(w[0])).collect();
        let per_mini = BLOCK / MINIBLOCKS;
        for block in deltas.chunks(BLOCK) {
            let min_delta = *block.iter().min().unwrap();
            push_zigzag(&mut out, min_delta);
            let mut widths = [0u8; MINIBLOCKS];
            let minis: Vec<&[i64]> = block.chunks(per_mini).collect();
            for (i, mini) in minis.iter().enumerate() {
                let max = mini
                    .iter()
                    .map(|&d| (d.wrapping_sub(min_delta)) as u64)
                    .max()
                    .unwrap();
                widths[i] = (64 - max.leading_zeros()) as u8;
            }
            out.extend_from_slice(&widths);
            for (i, mini) in minis.iter().enumerate() {
                let width = widths[i] as usize;
                let mut bits = vec![0u8; per_mini * width / 8];
                for (j, &d) in mini.iter().enumerate() {
                    let adjusted = (d.wrapping_sub(min_delta)) as u64;
                    for bit in 0..width {
                        if (adjusted >> bit) & 1 == 1 {
                            let pos = j * width + bit;
                            bits[pos / 8] |= 1 << (pos % 8);
                        }
                    }
                }
                out.extend_from_slice(&bits);
            }
        }
        out
    }

    fn round_trip(values: &[i64]) {
        let encoded = encode(values);
        let mut decoder =
            DeltaBinaryPackedDecoder::new(ByteVec::copy_from_slice(&encoded), 0).unwrap();
        let mut out = vec![0i64; values.len()];
        decoder.get_batch(&mut out).unwrap();
        assert_eq!(out, values);
    }

    #[test]
    fn test_ascending() {
        let values: Vec<i64> = (0..300).collect();
        round_trip(&values);
    }

    #[test]
    fn test_negative_deltas() {
        let values: Vec<i64> = (0..300).map(|i| 1000 - i * 3).collect();
        round_trip(&values);
    }

    #[test]
    fn test_unordered_values() {
        let values: Vec<i64> = (0..500).map(|_| fastrand::i64(-1_000_000..1_000_000)).collect();
        round_trip(&values);
    }

    #[test]
    fn test_single_value() {
        round_trip(&[42]);
    }

    #[test]
    fn test_batched_reads_preserve_state() {
        let values: Vec<i64> = (0..260).map(|i| i * i).collect();
        let encoded = encode(&values);
        let mut decoder =
            DeltaBinaryPackedDecoder::new(ByteVec::copy_from_slice(&encoded), 0).unwrap();
        let mut out = Vec::new();
        for chunk in [1usize, 100, 59, 100] {
            let mut batch = vec![0i64; chunk];
            decoder.get_batch(&mut batch).unwrap();
            out.extend(batch);
        }
        assert_eq!(out, values);
    }

    #[test]
    fn test_over_read_rejected() {
        let values: Vec<i64> = (0..10).collect();
        let encoded = encode(&values);
        let mut decoder =
            DeltaBinaryPackedDecoder::new(ByteVec::copy_from_slice(&encoded), 0).unwrap();
        let mut out = vec![0i64; 11];
        let err = decoder.get_batch(&mut out).unwrap_err();
        assert!(err.to_string().contains("remaining"));
    }

    #[test]
    fn test_truncated_stream() {
        let values: Vec<i64> = (0..200).collect();
        let encoded = encode(&values);
        let mut decoder = DeltaBinaryPackedDecoder::new(
            ByteVec::copy_from_slice(&encoded[..encoded.len() / 4]),
            0,
        )
        .unwrap();
        let mut out = vec![0i64; 200];
        assert!(decoder.get_batch(&mut out).is_err());
    }
}
