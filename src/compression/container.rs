//! Self-describing container around the codec output.
//!
//! Layout, integers big-endian:
//!
//! | offset | field                                  | size      |
//! |--------|----------------------------------------|-----------|
//! | 0      | algorithm tag (0 = Huffman, 1 = LZW)   | 1 byte    |
//! | 1      | original length                        | 4 bytes   |
//! | 5      | metadata                               | variable  |
//! | ...    | packed payload                         | remainder |
//!
//! Huffman metadata is the code-length table (see [`CodeTable::write_to`]);
//! LZW metadata is the maximum code width as a single byte.

use crate::compression::huffman::{self, CodeTable};
use crate::compression::lzw::{self, LzwConfig};
use crate::compression::{Compression, Result};
use crate::error::Error;
use log::debug;
use std::fmt;
use std::str::FromStr;

/// Size of the tag and original-length fields.
pub const HEADER_LEN: usize = 5;

/// The codec a container was written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Huffman,
    Lzw,
}

impl Algorithm {
    pub const ALL: [Algorithm; 2] = [Algorithm::Huffman, Algorithm::Lzw];

    /// Tag byte stored at the start of a container.
    pub fn tag(self) -> u8 {
        match self {
            Algorithm::Huffman => 0,
            Algorithm::Lzw => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Huffman => "huffman",
            Algorithm::Lzw => "lzw",
        }
    }
}

impl TryFrom<u8> for Algorithm {
    type Error = Error;

    fn try_from(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(Algorithm::Huffman),
            1 => Ok(Algorithm::Lzw),
            other => Err(Error::UnsupportedAlgorithm(other)),
        }
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "huffman" => Ok(Algorithm::Huffman),
            "lzw" => Ok(Algorithm::Lzw),
            _ => Err(Error::invalid_input(format!("unknown algorithm '{}'", s))),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Codec-specific data needed to decode the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Metadata {
    Huffman(CodeTable),
    Lzw(LzwConfig),
}

impl Metadata {
    pub fn algorithm(&self) -> Algorithm {
        match self {
            Metadata::Huffman(_) => Algorithm::Huffman,
            Metadata::Lzw(_) => Algorithm::Lzw,
        }
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            Metadata::Huffman(table) => table.write_to(out),
            Metadata::Lzw(config) => out.push(config.max_code_width()),
        }
    }

    fn serialized_len(&self) -> usize {
        match self {
            Metadata::Huffman(table) => 2 + 2 * table.len(),
            Metadata::Lzw(_) => 1,
        }
    }
}

/// A compressed input: what [`compress`] produces and [`decompress`] consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedBlob {
    original_len: usize,
    metadata: Metadata,
    payload: Vec<u8>,
}

impl CompressedBlob {
    pub fn algorithm(&self) -> Algorithm {
        self.metadata.algorithm()
    }

    /// Length of the uncompressed data.
    pub fn original_len(&self) -> usize {
        self.original_len
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Packed codec output, without header or metadata.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Size of [`CompressedBlob::serialize`]'s output.
    pub fn serialized_len(&self) -> usize {
        HEADER_LEN + self.metadata.serialized_len() + self.payload.len()
    }

    /// Percentage of the original size saved; negative when the container is larger.
    pub fn compression_rate(&self) -> f64 {
        if self.original_len == 0 {
            return 0.0;
        }
        100.0 - self.serialized_len() as f64 * 100.0 / self.original_len as f64
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.serialized_len());
        out.push(self.algorithm().tag());
        // `compress` and `deserialize` both bound the length to u32.
        out.extend_from_slice(&(self.original_len as u32).to_be_bytes());
        self.metadata.write_to(&mut out);
        out.extend_from_slice(&self.payload);
        out
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let &tag = bytes
            .first()
            .ok_or_else(|| Error::format("container is empty"))?;
        let algorithm = Algorithm::try_from(tag)?;
        let len_bytes: [u8; 4] = bytes
            .get(1..HEADER_LEN)
            .and_then(|slice| slice.try_into().ok())
            .ok_or_else(|| Error::format("container header is truncated"))?;
        let original_len = u32::from_be_bytes(len_bytes) as usize;
        let rest = &bytes[HEADER_LEN..];

        let (metadata, used) = match algorithm {
            Algorithm::Huffman => {
                let (table, used) = CodeTable::read_from(rest)?;
                (Metadata::Huffman(table), used)
            }
            Algorithm::Lzw => {
                let &width = rest
                    .first()
                    .ok_or_else(|| Error::format("LZW metadata is missing"))?;
                let config = LzwConfig::new(width)
                    .map_err(|_| Error::format(format!("invalid LZW code width {}", width)))?;
                (Metadata::Lzw(config), 1)
            }
        };
        let payload = rest[used..].to_vec();

        if let Metadata::Huffman(table) = &metadata {
            if original_len > 0 && table.is_empty() {
                return Err(Error::format("empty code table for non-empty data"));
            }
            // Every symbol takes at least one bit.
            if (payload.len() as u64) * 8 < original_len as u64 {
                return Err(Error::format(format!(
                    "{} payload bytes cannot hold {} symbols",
                    payload.len(),
                    original_len
                )));
            }
        }

        Ok(CompressedBlob {
            original_len,
            metadata,
            payload,
        })
    }
}

/// Compresses `data` with `algorithm`, using the default LZW configuration.
pub fn compress(data: &[u8], algorithm: Algorithm) -> Result<CompressedBlob> {
    compress_with(data, algorithm, LzwConfig::default())
}

/// Compresses `data` with `algorithm`; `lzw_config` applies only to [`Algorithm::Lzw`].
pub fn compress_with(
    data: &[u8],
    algorithm: Algorithm,
    lzw_config: LzwConfig,
) -> Result<CompressedBlob> {
    check_capacity(data.len())?;

    let (metadata, payload) = match algorithm {
        Algorithm::Huffman => {
            let encoded = huffman::encode(data)?;
            (Metadata::Huffman(encoded.table), encoded.payload)
        }
        Algorithm::Lzw => (
            Metadata::Lzw(lzw_config),
            lzw::encode(data, lzw_config),
        ),
    };
    let blob = CompressedBlob {
        original_len: data.len(),
        metadata,
        payload,
    };
    debug!(
        "{}: {} bytes -> {} bytes ({:.2}% gain)",
        algorithm,
        data.len(),
        blob.serialized_len(),
        blob.compression_rate()
    );
    Ok(blob)
}

/// The original-length field is a `u32`.
fn check_capacity(len: usize) -> Result<()> {
    if u32::try_from(len).is_err() {
        return Err(Error::Capacity(format!(
            "{} bytes exceed the {} byte limit of the container",
            len,
            u32::MAX
        )));
    }
    Ok(())
}

/// Restores the original bytes of `blob`.
pub fn decompress(blob: &CompressedBlob) -> Result<Vec<u8>> {
    match &blob.metadata {
        Metadata::Huffman(table) => huffman::decode(table, &blob.payload, blob.original_len),
        Metadata::Lzw(config) => lzw::decode(&blob.payload, blob.original_len, *config),
    }
}

/// Huffman coding behind the [`Compression`] trait, producing whole containers.
#[derive(Debug, Clone, Copy, Default)]
pub struct HuffmanCodec;

/// LZW coding behind the [`Compression`] trait, producing whole containers.
#[derive(Debug, Clone, Copy, Default)]
pub struct LzwCodec {
    config: LzwConfig,
}

impl LzwCodec {
    pub fn new(config: LzwConfig) -> Self {
        LzwCodec { config }
    }
}

impl Compression for HuffmanCodec {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(compress(data, Algorithm::Huffman)?.serialize())
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        decompress(&CompressedBlob::deserialize(data)?)
    }
}

impl Compression for LzwCodec {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(compress_with(data, Algorithm::Lzw, self.config)?.serialize())
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        decompress(&CompressedBlob::deserialize(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn samples() -> Vec<Vec<u8>> {
        let mut rng = StdRng::seed_from_u64(2024);
        let mut random = vec![0u8; 50_000];
        rng.fill(&mut random[..]);
        vec![
            Vec::new(),
            vec![42],
            vec![7; 4096],
            b"aaaabbbcc".to_vec(),
            b"ABABABABAB".to_vec(),
            b"She sells sea shells by the sea shore. ".repeat(100),
            (0..=255).collect(),
            random,
        ]
    }

    #[test]
    fn test_roundtrip_through_bytes() {
        for algorithm in Algorithm::ALL {
            for input in samples() {
                let blob = compress(&input, algorithm).unwrap();
                assert_eq!(blob.algorithm(), algorithm);
                assert_eq!(blob.original_len(), input.len());
                let bytes = blob.serialize();
                assert_eq!(bytes.len(), blob.serialized_len());
                let restored = CompressedBlob::deserialize(&bytes).unwrap();
                assert_eq!(restored, blob);
                assert_eq!(decompress(&restored).unwrap(), input, "{}", algorithm);
            }
        }
    }

    #[test]
    fn test_huffman_layout() {
        let bytes = compress(b"aaaabbbcc", Algorithm::Huffman)
            .unwrap()
            .serialize();
        assert_eq!(
            bytes,
            vec![0, 0, 0, 0, 9, 0, 3, b'a', 1, b'b', 2, b'c', 2, 0x0A, 0xBC]
        );
    }

    #[test]
    fn test_lzw_layout() {
        let config = LzwConfig::new(12).unwrap();
        let blob = compress_with(b"ABABABABAB", Algorithm::Lzw, config).unwrap();
        let bytes = blob.serialize();
        assert_eq!(&bytes[..6], &[1, 0, 0, 0, 10, 12]);
        assert_eq!(&bytes[6..], blob.payload());
        assert_eq!(blob.metadata(), &Metadata::Lzw(config));
    }

    #[test]
    fn test_empty_input_layout() {
        assert_eq!(
            compress(b"", Algorithm::Huffman).unwrap().serialize(),
            vec![0, 0, 0, 0, 0, 0, 0]
        );
        assert_eq!(
            compress(b"", Algorithm::Lzw).unwrap().serialize(),
            vec![1, 0, 0, 0, 0, lzw::DEFAULT_MAX_CODE_WIDTH]
        );
    }

    #[test]
    fn test_unknown_tag() {
        let mut bytes = compress(b"hello", Algorithm::Lzw).unwrap().serialize();
        bytes[0] = 7;
        assert!(matches!(
            CompressedBlob::deserialize(&bytes),
            Err(Error::UnsupportedAlgorithm(7))
        ));
        assert!(matches!(
            CompressedBlob::deserialize(&[0xFF]),
            Err(Error::UnsupportedAlgorithm(0xFF))
        ));
    }

    #[test]
    fn test_malformed_containers() {
        let malformed: Vec<Vec<u8>> = vec![
            vec![],
            vec![0, 0, 0],
            // Huffman table header cut short.
            vec![0, 0, 0, 0, 1, 0],
            // Non-empty data with an empty table.
            vec![0, 0, 0, 0, 1, 0, 0, 0xFF],
            // Table claims one symbol of length 1 but the payload is too short.
            vec![0, 0, 0, 0, 9, 0, 1, b'a', 1, 0x00],
            // LZW without its width byte.
            vec![1, 0, 0, 0, 1],
            // LZW width out of range.
            vec![1, 0, 0, 0, 1, 40, 0x41],
        ];
        for bytes in malformed {
            assert!(
                matches!(CompressedBlob::deserialize(&bytes), Err(Error::Format(_))),
                "{:?}",
                bytes
            );
        }
    }

    #[test]
    fn test_corrupt_payload() {
        let mut bytes = compress(b"TOBEORNOTTOBEORTOBEORNOT", Algorithm::Lzw)
            .unwrap()
            .serialize();
        bytes.truncate(bytes.len() - 4);
        let blob = CompressedBlob::deserialize(&bytes).unwrap();
        assert!(matches!(decompress(&blob), Err(Error::Format(_))));
    }

    #[test]
    fn test_algorithm_names() {
        assert_eq!("Huffman".parse::<Algorithm>().unwrap(), Algorithm::Huffman);
        assert_eq!("LZW".parse::<Algorithm>().unwrap(), Algorithm::Lzw);
        assert!(matches!(
            "zip".parse::<Algorithm>(),
            Err(Error::InvalidInput(_))
        ));
        assert_eq!(Algorithm::Lzw.to_string(), "lzw");
        for algorithm in Algorithm::ALL {
            assert_eq!(Algorithm::try_from(algorithm.tag()).unwrap(), algorithm);
        }
    }

    #[test]
    fn test_length_field_capacity() {
        assert!(check_capacity(0).is_ok());
        assert!(check_capacity(u32::MAX as usize).is_ok());
        if let Some(too_long) = (u32::MAX as usize).checked_add(1) {
            assert!(matches!(check_capacity(too_long), Err(Error::Capacity(_))));
            assert!(matches!(check_capacity(usize::MAX), Err(Error::Capacity(_))));
        }
    }

    #[test]
    fn test_compression_rate() {
        let input = b"compressible text, compressible text, ".repeat(500);
        for algorithm in Algorithm::ALL {
            let blob = compress(&input, algorithm).unwrap();
            assert!(blob.compression_rate() > 0.0, "{}", algorithm);
        }
        let tiny = compress(b"x", Algorithm::Huffman).unwrap();
        assert!(tiny.compression_rate() < 0.0);
        assert_eq!(compress(b"", Algorithm::Lzw).unwrap().compression_rate(), 0.0);
    }

    #[test]
    fn test_compression_trait() {
        let input = b"trait objects dispatch to the container".repeat(10);
        let codecs: Vec<Box<dyn Compression>> = vec![
            Box::new(HuffmanCodec),
            Box::new(LzwCodec::new(LzwConfig::new(10).unwrap())),
        ];
        for codec in &codecs {
            let packed = codec.compress(&input).unwrap();
            assert_eq!(codec.decompress(&packed).unwrap(), input);
        }
        // Containers are self-describing, so any codec can open any container.
        let packed = HuffmanCodec.compress(&input).unwrap();
        assert_eq!(LzwCodec::default().decompress(&packed).unwrap(), input);
    }
}
