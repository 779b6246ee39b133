use thiserror::Error;

use tel_types::{TypeError, VarintError};

/// Errors that make a byte buffer unparsable as a block.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BlockError {
    #[error("invalid varint at offset {offset}: {source}")]
    Varint { offset: usize, source: VarintError },

    #[error("field of {needed} bytes overruns buffer ({available} bytes left)")]
    Overrun { needed: u64, available: usize },

    #[error("unknown block type tag: {0}")]
    UnknownType(u64),

    #[error("nesting deeper than {max_depth} levels")]
    TooDeep { max_depth: usize },

    #[error("{0} trailing bytes after block")]
    TrailingBytes(usize),

    #[error("malformed block type sequence: {0}")]
    Sequence(TypeError),

    #[error("signing failed: {0}")]
    Signing(String),
}

pub type BlockResult<T> = Result<T, BlockError>;
