//! Bit-level input and output shared by the Huffman and LZW codecs.
//!
//! Bits are packed most-significant-bit first: the first bit written lands in
//! bit 7 of the first byte. A value written with `write_bits(value, width)`
//! appears with its most significant of the `width` bits first, so a reader
//! calling `read_bits(width)` at the same position gets `value` back.
//!
//! The final partial byte is padded with zero bits by [`BitWriter::finish`].
//! The padding is indistinguishable from data, so the reader cannot know where
//! the logical stream ends; codecs gate their reads by a symbol or byte count.

use crate::compression::Result;
use crate::error::Error;
use bitvec::prelude::*;

/// Largest width accepted by [`BitWriter::write_bits`] and [`BitReader::read_bits`].
pub const MAX_WIDTH: u32 = u64::BITS;

/// Accumulates bits in memory, MSB-first.
#[derive(Debug, Clone, Default)]
pub struct BitWriter {
    bits: BitVec<u8, Msb0>,
}

impl BitWriter {
    pub fn new() -> Self {
        BitWriter {
            bits: BitVec::new(),
        }
    }

    /// Creates a writer with room for `bits` bits before reallocating.
    pub fn with_capacity(bits: usize) -> Self {
        BitWriter {
            bits: BitVec::with_capacity(bits),
        }
    }

    /// Appends a single bit.
    pub fn write_bit(&mut self, bit: bool) {
        self.bits.push(bit);
    }

    /// Appends the `width` low bits of `value`, most significant first.
    ///
    /// Bits of `value` above `width` are ignored.
    ///
    /// # Panics
    ///
    /// Panics if `width` is greater than [`MAX_WIDTH`].
    pub fn write_bits(&mut self, value: u64, width: u32) {
        assert!(width <= MAX_WIDTH, "bit width {} exceeds {}", width, MAX_WIDTH);
        for shift in (0..width).rev() {
            self.bits.push((value >> shift) & 1 == 1);
        }
    }

    /// Number of bits written so far, excluding padding.
    pub fn bit_len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Pads the last byte with zero bits and returns the packed bytes.
    pub fn finish(mut self) -> Vec<u8> {
        while self.bits.len() % 8 != 0 {
            self.bits.push(false);
        }
        self.bits.into_vec()
    }
}

/// Reads bits back in the order a [`BitWriter`] wrote them.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    bits: &'a BitSlice<u8, Msb0>,
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        BitReader {
            bits: data.view_bits::<Msb0>(),
            pos: 0,
        }
    }

    /// Reads one bit, failing once the underlying bytes are exhausted.
    pub fn read_bit(&mut self) -> Result<bool> {
        let bit = *self
            .bits
            .get(self.pos)
            .ok_or_else(|| Error::format("bitstream ended unexpectedly"))?;
        self.pos += 1;
        Ok(bit)
    }

    /// Reads `width` bits as an unsigned integer, most significant first.
    ///
    /// Nothing is consumed when fewer than `width` bits remain.
    pub fn read_bits(&mut self, width: u32) -> Result<u64> {
        if width > MAX_WIDTH {
            return Err(Error::invalid_input(format!(
                "bit width {} exceeds {}",
                width, MAX_WIDTH
            )));
        }
        let width = width as usize;
        if self.remaining() < width {
            return Err(Error::format(format!(
                "bitstream ended unexpectedly: needed {} bits, {} left",
                width,
                self.remaining()
            )));
        }
        let value = self.bits[self.pos..self.pos + width]
            .iter()
            .by_vals()
            .fold(0u64, |acc, bit| (acc << 1) | bit as u64);
        self.pos += width;
        Ok(value)
    }

    /// Number of bits consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of bits left, including any trailing padding.
    pub fn remaining(&self) -> usize {
        self.bits.len() - self.pos
    }
}
