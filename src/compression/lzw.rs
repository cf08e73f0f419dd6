//! LZW (Lempel-Ziv-Welch) coding with variable-width codes.
//!
//! Both dictionaries start with the 256 single-byte sequences (codes 0-255)
//! and gain one entry per emitted code until they hold `1 << max_code_width`
//! entries. From then on they are frozen: existing entries stay usable and
//! nothing is added. The dictionary is never transmitted; the decoder grows
//! its copy under the same rule and stays one entry behind the encoder.
//!
//! # Code width
//!
//! A code emitted while the encoder's dictionary holds `n` entries is written
//! with just enough bits to represent `n - 1`, never fewer than 8. The first
//! code is therefore 8 bits wide, the next 255 are 9 bits wide, and so on. The
//! decoder knows how many codes it has read and derives the same width before
//! reading each one.
//!
//! # Example
//!
//! ```
//! use torpack::compression::lzw::{compress_codes, decompress_codes, LzwConfig};
//!
//! let config = LzwConfig::default();
//! let codes = compress_codes(b"TOBEORNOTTOBEORTOBEORNOT", config);
//! assert!(codes.iter().any(|&code| code >= 256));
//! let decoded = decompress_codes(&codes, config).unwrap();
//! assert_eq!(decoded, b"TOBEORNOTTOBEORTOBEORNOT");
//! ```

use crate::compression::bitstream::{BitReader, BitWriter};
use crate::compression::Result;
use crate::error::Error;
use log::{debug, trace};
use std::collections::HashMap;

/// Number of single-byte entries every dictionary starts with.
pub const SEED_ENTRIES: u32 = 256;

/// Width of the first emitted code.
pub const MIN_CODE_WIDTH: u8 = 8;

/// Accepted range for [`LzwConfig::max_code_width`].
pub const MAX_CODE_WIDTH_RANGE: std::ops::RangeInclusive<u8> = 9..=24;

/// Maximum code width used when none is configured.
pub const DEFAULT_MAX_CODE_WIDTH: u8 = 16;

/// Dictionary limits shared by encoder and decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LzwConfig {
    max_code_width: u8,
}

impl LzwConfig {
    /// Creates a configuration whose dictionary stops growing at
    /// `1 << max_code_width` entries.
    pub fn new(max_code_width: u8) -> Result<Self> {
        if !MAX_CODE_WIDTH_RANGE.contains(&max_code_width) {
            return Err(Error::invalid_input(format!(
                "maximum code width must be between {} and {} bits, got {}",
                MAX_CODE_WIDTH_RANGE.start(),
                MAX_CODE_WIDTH_RANGE.end(),
                max_code_width
            )));
        }
        Ok(LzwConfig { max_code_width })
    }

    pub fn max_code_width(&self) -> u8 {
        self.max_code_width
    }

    /// Dictionary size at which growth stops.
    pub fn max_entries(&self) -> u32 {
        1 << self.max_code_width
    }
}

impl Default for LzwConfig {
    fn default() -> Self {
        LzwConfig {
            max_code_width: DEFAULT_MAX_CODE_WIDTH,
        }
    }
}

/// Bits needed for a code emitted while the dictionary holds `entries` entries.
pub fn code_width(entries: u32) -> u8 {
    let width = u32::BITS - entries.saturating_sub(1).leading_zeros();
    (width as u8).max(MIN_CODE_WIDTH)
}

/// A code produced by [`LzwEncoder`] together with the width it must be written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmittedCode {
    pub code: u32,
    pub width: u8,
}

/// Incremental LZW encoder.
///
/// Multi-byte sequences are keyed by (code of the sequence minus its last
/// byte, last byte); single bytes are their own codes and never stored.
#[derive(Debug, Clone)]
pub struct LzwEncoder {
    dict: HashMap<(u32, u8), u32>,
    next_code: u32,
    max_entries: u32,
    current: Option<u32>,
}

impl LzwEncoder {
    pub fn new(config: LzwConfig) -> Self {
        LzwEncoder {
            dict: HashMap::new(),
            next_code: SEED_ENTRIES,
            max_entries: config.max_entries(),
            current: None,
        }
    }

    /// Number of dictionary entries, seeds included.
    pub fn dictionary_len(&self) -> usize {
        self.next_code as usize
    }

    /// Feeds one byte, returning a code when the current match cannot be extended.
    pub fn push(&mut self, byte: u8) -> Option<EmittedCode> {
        let Some(prefix) = self.current else {
            self.current = Some(byte as u32);
            return None;
        };
        if let Some(&code) = self.dict.get(&(prefix, byte)) {
            self.current = Some(code);
            return None;
        }

        let emitted = EmittedCode {
            code: prefix,
            width: code_width(self.next_code),
        };
        if self.next_code < self.max_entries {
            self.dict.insert((prefix, byte), self.next_code);
            self.next_code += 1;
            if self.next_code == self.max_entries {
                debug!("lzw: dictionary full at {} entries", self.max_entries);
            }
        }
        self.current = Some(byte as u32);
        Some(emitted)
    }

    /// Emits the code for whatever match is still pending.
    pub fn finish(&mut self) -> Option<EmittedCode> {
        self.current.take().map(|code| EmittedCode {
            code,
            width: code_width(self.next_code),
        })
    }
}

/// A decoder dictionary entry, stored as a link to its prefix.
#[derive(Debug, Clone, Copy)]
struct Entry {
    /// Code of the sequence without its last byte; unused for seeds.
    prefix: u32,
    byte: u8,
    first: u8,
    len: usize,
}

/// Incremental LZW decoder, the mirror of [`LzwEncoder`].
#[derive(Debug, Clone)]
pub struct LzwDecoder {
    entries: Vec<Entry>,
    max_entries: u32,
    previous: Option<u32>,
}

impl LzwDecoder {
    pub fn new(config: LzwConfig) -> Self {
        let entries = (0..SEED_ENTRIES)
            .map(|code| Entry {
                prefix: code,
                byte: code as u8,
                first: code as u8,
                len: 1,
            })
            .collect();
        LzwDecoder {
            entries,
            max_entries: config.max_entries(),
            previous: None,
        }
    }

    /// Number of dictionary entries, seeds included.
    pub fn dictionary_len(&self) -> usize {
        self.entries.len()
    }

    /// Width of the next code in the stream.
    pub fn code_width(&self) -> u8 {
        // The encoder was one entry ahead when it emitted the next code.
        let encoder_entries = match self.previous {
            None => SEED_ENTRIES,
            Some(_) => (self.entries.len() as u32 + 1).min(self.max_entries),
        };
        code_width(encoder_entries)
    }

    /// Decodes one code, appending its bytes to `out`.
    pub fn decode_code(&mut self, code: u32, out: &mut Vec<u8>) -> Result<()> {
        let size = self.entries.len() as u32;
        let start = out.len();
        let Some(previous) = self.previous else {
            if code >= SEED_ENTRIES {
                return Err(Error::format(format!(
                    "first code {} is not a single byte",
                    code
                )));
            }
            out.push(code as u8);
            self.previous = Some(code);
            return Ok(());
        };

        if code < size {
            self.write_entry(code, out);
        } else if code == size && size < self.max_entries {
            // The code names the entry being created: previous + its own first byte.
            self.write_entry(previous, out);
            out.push(self.entries[previous as usize].first);
        } else {
            return Err(Error::format(format!(
                "code {} is outside the dictionary of {} entries",
                code, size
            )));
        }

        if size < self.max_entries {
            let prev = self.entries[previous as usize];
            self.entries.push(Entry {
                prefix: previous,
                byte: out[start],
                first: prev.first,
                len: prev.len + 1,
            });
            trace!("lzw: entry {} has {} bytes", size, prev.len + 1);
        }
        self.previous = Some(code);
        Ok(())
    }

    fn write_entry(&self, code: u32, out: &mut Vec<u8>) {
        let entry = self.entries[code as usize];
        let start = out.len();
        out.resize(start + entry.len, 0);
        let mut code = code;
        for slot in out[start..].iter_mut().rev() {
            let entry = self.entries[code as usize];
            *slot = entry.byte;
            code = entry.prefix;
        }
    }
}

/// Compresses `input` into a sequence of dictionary codes.
pub fn compress_codes(input: &[u8], config: LzwConfig) -> Vec<u32> {
    let mut encoder = LzwEncoder::new(config);
    let mut codes: Vec<u32> = input
        .iter()
        .filter_map(|&byte| encoder.push(byte))
        .map(|emitted| emitted.code)
        .collect();
    codes.extend(encoder.finish().map(|emitted| emitted.code));
    codes
}

/// Expands a sequence of dictionary codes produced by [`compress_codes`].
pub fn decompress_codes(codes: &[u32], config: LzwConfig) -> Result<Vec<u8>> {
    let mut decoder = LzwDecoder::new(config);
    let mut output = Vec::new();
    for &code in codes {
        decoder.decode_code(code, &mut output)?;
    }
    Ok(output)
}

/// LZW-encodes `data` and packs the codes into bytes.
pub fn encode(data: &[u8], config: LzwConfig) -> Vec<u8> {
    let mut encoder = LzwEncoder::new(config);
    let mut writer = BitWriter::with_capacity(data.len() * MIN_CODE_WIDTH as usize);
    let mut codes = 0usize;
    let mut width = MIN_CODE_WIDTH;
    let mut emit = |emitted: EmittedCode, writer: &mut BitWriter| {
        if emitted.width != width {
            trace!(
                "lzw: code width grows to {} bits at code {}",
                emitted.width,
                codes
            );
            width = emitted.width;
        }
        writer.write_bits(emitted.code as u64, emitted.width as u32);
        codes += 1;
    };
    for &byte in data {
        if let Some(emitted) = encoder.push(byte) {
            emit(emitted, &mut writer);
        }
    }
    if let Some(emitted) = encoder.finish() {
        emit(emitted, &mut writer);
    }
    debug!(
        "lzw: {} bytes -> {} codes, {} dictionary entries, {} payload bits",
        data.len(),
        codes,
        encoder.dictionary_len(),
        writer.bit_len()
    );
    writer.finish()
}

/// Decodes codes from `payload` until exactly `original_len` bytes are produced.
pub fn decode(payload: &[u8], original_len: usize, config: LzwConfig) -> Result<Vec<u8>> {
    let mut decoder = LzwDecoder::new(config);
    let mut reader = BitReader::new(payload);
    let mut output = Vec::with_capacity(original_len.min(payload.len().saturating_mul(8)));
    while output.len() < original_len {
        let code = reader.read_bits(decoder.code_width() as u32)?;
        decoder.decode_code(code as u32, &mut output)?;
    }
    if output.len() > original_len {
        return Err(Error::format(format!(
            "decoded {} bytes, expected {}",
            output.len(),
            original_len
        )));
    }
    debug!(
        "lzw: decoded {} bytes from {} bits, {} dictionary entries",
        output.len(),
        reader.position(),
        decoder.dictionary_len()
    );
    Ok(output)
}
