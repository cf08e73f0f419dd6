//! Compression algorithms implementation.
//!
//! This module provides two interchangeable lossless codecs and the container
//! that makes their output self-describing:
//! - Huffman coding with canonical code tables
//! - LZW coding with variable-width codes
//! - A shared MSB-first bit stream
//!
//! # Examples
//!
//! ```rust
//! use torpack::compression::{compress, decompress, Algorithm, CompressedBlob};
//!
//! let input = b"aaaabbbcc";
//! let bytes = compress(input, Algorithm::Huffman).unwrap().serialize();
//! let blob = CompressedBlob::deserialize(&bytes).unwrap();
//! assert_eq!(decompress(&blob).unwrap(), input);
//! ```

pub use crate::error::Result;

/// Trait for compression algorithms
pub trait Compression {
    /// Compress the input data
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Decompress the compressed data
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>>;
}

pub mod bitstream;
pub use bitstream::{BitReader, BitWriter};

pub mod huffman;
pub use huffman::{CodeTable, FrequencyTable, HuffmanNode, HuffmanTree};

pub mod lzw;
pub use lzw::{LzwConfig, LzwDecoder, LzwEncoder};

pub mod container;
pub use container::{
    compress, compress_with, decompress, Algorithm, CompressedBlob, HuffmanCodec, LzwCodec,
    Metadata,
};
