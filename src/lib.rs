pub mod compression;
pub mod error;

pub use compression::{compress, decompress, Algorithm, CompressedBlob, Compression};
pub use error::{Error, Result};
