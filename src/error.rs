use thiserror::Error;

/// Errors returned by the codecs and the container.
#[derive(Debug, Error)]
pub enum Error {
    /// Corrupt, truncated or otherwise invalid compressed data.
    #[error("Malformed compressed data: {0}")]
    Format(String),

    /// The container carries an algorithm tag this crate does not know.
    #[error("Unsupported algorithm tag: {0}")]
    UnsupportedAlgorithm(u8),

    /// The input cannot be represented in the container.
    #[error("Capacity exceeded: {0}")]
    Capacity(String),

    /// The caller supplied an invalid parameter.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    pub fn format<S: Into<String>>(msg: S) -> Self {
        Error::Format(msg.into())
    }

    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Error::InvalidInput(msg.into())
    }
}

/// Result type for fallible operations in this crate
pub type Result<T> = std::result::Result<T, Error>;
