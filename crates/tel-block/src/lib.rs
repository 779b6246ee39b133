//! Block wire format for the tamper-evident ledger.
//!
//! A block is a varint type tag followed by variant-specific fields.
//! Encapsulations (signature, previous-block binding, context binding,
//! context update) wrap exactly one inner block, recursively. Terminal
//! blocks consume whatever bytes remain, so a producer can stream a payload
//! without knowing its length up front.
//!
//! - [`Block`]: parsed, immutable block retaining its raw bytes
//! - [`BlockBuilder`]: deterministic encoder, including deferred signatures
//! - [`BlockTypeSequence`]: outer-to-innermost nesting shape

pub mod block;
pub mod builder;
pub mod error;
pub mod reader;
pub mod sequence;

pub use block::{Block, BlockBody, Layers};
pub use builder::{BlockBuilder, BlockSigner, SignatureSource};
pub use error::{BlockError, BlockResult};
pub use reader::{ReadOptions, DEFAULT_MAX_DEPTH};
pub use sequence::BlockTypeSequence;
pub use tel_types::BlockType;
