//! Huffman coding over bytes.
//!
//! The encoder counts byte frequencies, builds a Huffman tree with a min-heap
//! and reads each symbol's code length off the depth of its leaf. Only those
//! lengths are persisted: both sides derive the same canonical code from them,
//! so the decoder never needs the frequencies or the original tree shape.
//!
//! # How canonical codes are assigned
//!
//! Symbols are sorted by (code length, symbol). The first gets the all-zero
//! code of its length; every following code is the previous one plus one,
//! shifted left by the difference in length. Any set of lengths satisfying
//! Kraft's inequality yields a prefix-free code this way.
//!
//! # Example
//!
//! ```
//! use torpack::compression::huffman::{decode, encode};
//!
//! let input = b"aaaabbbcc";
//! let encoded = encode(input).unwrap();
//! assert_eq!(encoded.bit_len, 14);
//! let decoded = decode(&encoded.table, &encoded.payload, input.len()).unwrap();
//! assert_eq!(decoded, input);
//! ```

use crate::compression::bitstream::{BitReader, BitWriter};
use crate::compression::Result;
use crate::error::Error;
use log::{debug, trace};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Longest code length a [`CodeTable`] accepts.
pub const MAX_CODE_LEN: u8 = 64;

/// Number of distinct byte values.
const ALPHABET_SIZE: usize = 256;

/// Byte occurrence counts for one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyTable {
    counts: [u64; ALPHABET_SIZE],
}

impl FrequencyTable {
    /// Counts every byte of `data` in one pass.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut counts = [0u64; ALPHABET_SIZE];
        for &byte in data {
            counts[byte as usize] += 1;
        }
        FrequencyTable { counts }
    }

    /// Occurrences of `symbol`, zero when absent.
    pub fn get(&self, symbol: u8) -> u64 {
        self.counts[symbol as usize]
    }

    /// Present symbols with their counts, in ascending symbol order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, u64)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, &count)| count > 0)
            .map(|(symbol, &count)| (symbol as u8, count))
    }

    /// Number of distinct symbols.
    pub fn len(&self) -> usize {
        self.counts.iter().filter(|&&count| count > 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Sum of all counts, equal to the length of the counted input.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}

/// A node of a [`HuffmanTree`]. Children are indices into the tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HuffmanNode {
    /// A leaf holds one symbol and its frequency.
    Leaf { symbol: u8, freq: u64 },
    /// An internal node with left and right children and their combined frequency.
    Internal { freq: u64, left: usize, right: usize },
}

impl HuffmanNode {
    /// Returns the frequency of the node.
    pub fn freq(&self) -> u64 {
        match self {
            HuffmanNode::Leaf { freq, .. } => *freq,
            HuffmanNode::Internal { freq, .. } => *freq,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, HuffmanNode::Leaf { .. })
    }
}

/// Huffman tree stored as a flat arena of nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HuffmanTree {
    nodes: Vec<HuffmanNode>,
    root: Option<usize>,
}

impl HuffmanTree {
    /// Builds the tree for the given frequencies.
    ///
    /// Construction is deterministic: ties between equal frequencies go to the
    /// node created first, and the first node popped becomes the left child.
    /// An empty table gives a tree without a root.
    pub fn from_frequencies(freqs: &FrequencyTable) -> Self {
        let mut nodes = Vec::with_capacity(2 * freqs.len());
        // Arena indices grow in insertion order, so they double as the tie-breaker.
        let mut heap = BinaryHeap::with_capacity(freqs.len());
        for (symbol, freq) in freqs.iter() {
            heap.push(Reverse((freq, nodes.len())));
            nodes.push(HuffmanNode::Leaf { symbol, freq });
        }

        while let Some(Reverse((left_freq, left))) = heap.pop() {
            let Some(Reverse((right_freq, right))) = heap.pop() else {
                return HuffmanTree {
                    nodes,
                    root: Some(left),
                };
            };
            let freq = left_freq + right_freq;
            heap.push(Reverse((freq, nodes.len())));
            nodes.push(HuffmanNode::Internal { freq, left, right });
        }

        HuffmanTree { nodes, root: None }
    }

    /// Index of the root node, `None` for an empty tree.
    pub fn root(&self) -> Option<usize> {
        self.root
    }

    pub fn node(&self, index: usize) -> Option<&HuffmanNode> {
        self.nodes.get(index)
    }

    pub fn nodes(&self) -> &[HuffmanNode] {
        &self.nodes
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_leaf()).count()
    }

    pub fn internal_count(&self) -> usize {
        self.nodes.len() - self.leaf_count()
    }

    /// Depth of every leaf, as `(symbol, length)` pairs sorted by symbol.
    ///
    /// A tree made of a single leaf still needs one bit per symbol, so that
    /// leaf is reported with length 1.
    pub fn code_lengths(&self) -> Vec<(u8, u8)> {
        let mut lengths = Vec::with_capacity(self.leaf_count());
        let mut stack: Vec<(usize, u8)> = self.root.map(|root| (root, 0)).into_iter().collect();
        while let Some((index, depth)) = stack.pop() {
            match self.nodes[index] {
                HuffmanNode::Leaf { symbol, .. } => lengths.push((symbol, depth.max(1))),
                HuffmanNode::Internal { left, right, .. } => {
                    stack.push((right, depth + 1));
                    stack.push((left, depth + 1));
                }
            }
        }
        lengths.sort_unstable();
        lengths
    }
}

/// A code word: the `len` low bits of `bits`, most significant first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Code {
    bits: u64,
    len: u8,
}

impl Code {
    pub fn bits(&self) -> u64 {
        self.bits
    }

    pub fn len(&self) -> u8 {
        self.len
    }

    /// True when `self` is a prefix of (or equal to) `other`.
    pub fn is_prefix_of(&self, other: &Code) -> bool {
        self.len <= other.len && other.bits >> (other.len - self.len) == self.bits
    }
}

/// Symbol to code mapping, rebuilt canonically from code lengths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeTable {
    codes: [Option<Code>; ALPHABET_SIZE],
}

impl CodeTable {
    /// Assigns canonical codes to `(symbol, length)` pairs.
    ///
    /// Fails when a symbol repeats, a length is zero or above [`MAX_CODE_LEN`],
    /// or the lengths cannot form a prefix-free code.
    pub fn from_lengths(lengths: &[(u8, u8)]) -> Result<Self> {
        let mut codes = [None; ALPHABET_SIZE];
        let mut sorted = Vec::with_capacity(lengths.len());
        // Kraft sum scaled by 2^64.
        let mut kraft: u128 = 0;
        for &(symbol, len) in lengths {
            if len == 0 || len > MAX_CODE_LEN {
                return Err(Error::format(format!(
                    "code length {} for symbol {} is out of range",
                    len, symbol
                )));
            }
            if sorted.iter().any(|&(_, s)| s == symbol) {
                return Err(Error::format(format!("symbol {} appears twice", symbol)));
            }
            kraft += 1u128 << (MAX_CODE_LEN - len);
            sorted.push((len, symbol));
        }
        if kraft > 1u128 << MAX_CODE_LEN {
            return Err(Error::format("code lengths do not form a prefix code"));
        }

        sorted.sort_unstable();
        let mut next: u128 = 0;
        let mut prev_len = 0u8;
        for (i, &(len, symbol)) in sorted.iter().enumerate() {
            if i > 0 {
                next += 1;
            }
            next <<= len - prev_len;
            prev_len = len;
            codes[symbol as usize] = Some(Code {
                bits: next as u64,
                len,
            });
        }

        Ok(CodeTable { codes })
    }

    pub fn get(&self, symbol: u8) -> Option<Code> {
        self.codes[symbol as usize]
    }

    /// Symbols with their codes, in ascending symbol order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, Code)> + '_ {
        self.codes
            .iter()
            .enumerate()
            .filter_map(|(symbol, code)| code.map(|code| (symbol as u8, code)))
    }

    /// Number of symbols with a code.
    pub fn len(&self) -> usize {
        self.codes.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(symbol, length)` pairs sorted by symbol, enough to rebuild the table.
    pub fn code_lengths(&self) -> Vec<(u8, u8)> {
        self.iter().map(|(symbol, code)| (symbol, code.len)).collect()
    }

    /// Bits needed to encode an input with the given frequencies.
    pub fn encoded_bit_len(&self, freqs: &FrequencyTable) -> u64 {
        freqs
            .iter()
            .map(|(symbol, count)| count * self.get(symbol).map_or(0, |code| code.len as u64))
            .sum()
    }

    /// Appends the serialized table: symbol count (u16, big-endian) followed by
    /// one `(symbol, length)` byte pair per symbol.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        let lengths = self.code_lengths();
        out.extend_from_slice(&(lengths.len() as u16).to_be_bytes());
        for (symbol, len) in lengths {
            out.push(symbol);
            out.push(len);
        }
    }

    /// Parses a table written by [`CodeTable::write_to`], returning it along
    /// with the number of bytes consumed.
    pub fn read_from(input: &[u8]) -> Result<(Self, usize)> {
        if input.len() < 2 {
            return Err(Error::format("code table header is truncated"));
        }
        let count = u16::from_be_bytes([input[0], input[1]]) as usize;
        if count > ALPHABET_SIZE {
            return Err(Error::format(format!(
                "code table lists {} symbols, at most {} are possible",
                count, ALPHABET_SIZE
            )));
        }
        let end = 2 + 2 * count;
        let entries = input
            .get(2..end)
            .ok_or_else(|| Error::format("code table is truncated"))?;
        let lengths: Vec<(u8, u8)> = entries.chunks_exact(2).map(|pair| (pair[0], pair[1])).collect();
        Ok((CodeTable::from_lengths(&lengths)?, end))
    }
}

/// Output of [`encode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanEncoding {
    /// Code table the payload was written with.
    pub table: CodeTable,
    /// Packed code bits, zero-padded to a whole byte.
    pub payload: Vec<u8>,
    /// Number of meaningful bits in `payload`.
    pub bit_len: u64,
}

/// Huffman-encodes `data`.
pub fn encode(data: &[u8]) -> Result<HuffmanEncoding> {
    let freqs = FrequencyTable::from_bytes(data);
    let tree = HuffmanTree::from_frequencies(&freqs);
    let lengths = tree.code_lengths();
    if let Some(&(symbol, len)) = lengths.iter().find(|&&(_, len)| len > MAX_CODE_LEN) {
        return Err(Error::Capacity(format!(
            "symbol {} needs a {}-bit code",
            symbol, len
        )));
    }
    let table = CodeTable::from_lengths(&lengths)?;
    debug!(
        "huffman: {} bytes, {} distinct symbols, {} tree nodes",
        data.len(),
        freqs.len(),
        tree.nodes().len()
    );
    for (symbol, code) in table.iter() {
        trace!(
            "huffman: {:#04x} x{} -> {:0width$b}",
            symbol,
            freqs.get(symbol),
            code.bits,
            width = code.len as usize
        );
    }

    let mut writer = BitWriter::with_capacity(table.encoded_bit_len(&freqs) as usize);
    for &byte in data {
        let Some(code) = table.codes[byte as usize] else {
            return Err(Error::format(format!("no code for symbol {}", byte)));
        };
        writer.write_bits(code.bits, code.len as u32);
    }
    let bit_len = writer.bit_len() as u64;
    debug!("huffman: {} payload bits", bit_len);

    Ok(HuffmanEncoding {
        table,
        payload: writer.finish(),
        bit_len,
    })
}

/// Decodes exactly `original_len` symbols from `payload`.
pub fn decode(table: &CodeTable, payload: &[u8], original_len: usize) -> Result<Vec<u8>> {
    if original_len == 0 {
        return Ok(Vec::new());
    }
    if table.is_empty() {
        return Err(Error::format("empty code table for non-empty data"));
    }
    let tree = DecodeTree::from_table(table)?;
    // Every symbol takes at least one bit.
    if (payload.len() as u64).saturating_mul(8) < original_len as u64 {
        return Err(Error::format(format!(
            "{} payload bytes cannot hold {} symbols",
            payload.len(),
            original_len
        )));
    }
    let mut reader = BitReader::new(payload);
    let mut output = Vec::with_capacity(original_len);
    let mut node = 0;
    while output.len() < original_len {
        let bit = reader.read_bit()?;
        let slot = tree.nodes[node][bit as usize];
        match slot {
            Slot::Leaf(symbol) => {
                output.push(symbol);
                node = 0;
            }
            Slot::Branch(next) => node = next,
            Slot::Empty => {
                return Err(Error::format(format!(
                    "bit {} does not continue any code",
                    reader.position() - 1
                )))
            }
        }
    }
    Ok(output)
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Empty,
    Leaf(u8),
    Branch(usize),
}

/// Binary trie over the codes of a [`CodeTable`]; node 0 is the root and
/// each node holds its 0-child and 1-child.
struct DecodeTree {
    nodes: Vec<[Slot; 2]>,
}

impl DecodeTree {
    fn from_table(table: &CodeTable) -> Result<Self> {
        let mut nodes = vec![[Slot::Empty; 2]];
        for (symbol, code) in table.iter() {
            let mut node = 0;
            for depth in (0..code.len).rev() {
                let bit = ((code.bits >> depth) & 1) as usize;
                if depth == 0 {
                    if !matches!(nodes[node][bit], Slot::Empty) {
                        return Err(Error::format("code table is not prefix-free"));
                    }
                    nodes[node][bit] = Slot::Leaf(symbol);
                    break;
                }
                let slot = nodes[node][bit];
                node = match slot {
                    Slot::Branch(next) => next,
                    Slot::Empty => {
                        nodes.push([Slot::Empty; 2]);
                        let next = nodes.len() - 1;
                        nodes[node][bit] = Slot::Branch(next);
                        next
                    }
                    Slot::Leaf(_) => return Err(Error::format("code table is not prefix-free")),
                };
            }
        }
        Ok(DecodeTree { nodes })
    }
}
