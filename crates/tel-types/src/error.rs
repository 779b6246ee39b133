use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("unknown block type tag: {0}")]
    UnknownBlockType(u64),

    #[error(transparent)]
    Varint(#[from] VarintError),
}

/// Errors produced while decoding a varint.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum VarintError {
    #[error("truncated varint")]
    Truncated,

    #[error("varint exceeds {max_bytes} bytes")]
    Overlong { max_bytes: usize },

    #[error("varint value overflows {bits} bits")]
    Overflow { bits: u32 },

    #[error("non-minimal varint encoding")]
    NonMinimal,
}
