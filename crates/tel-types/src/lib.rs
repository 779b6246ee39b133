//! Foundation types for the tamper-evident ledger (TEL).
//!
//! This crate provides the small, dependency-light pieces every other TEL
//! crate builds on.
//!
//! # Key Types
//!
//! - [`varint`]: Canonical unsigned LEB128 encoding used to frame block fields
//! - [`BlockType`]: The closed set of block and encapsulation tags
//! - [`hex_bytes`]: Serde helpers that render byte buffers as hex strings

pub mod block_type;
pub mod error;
pub mod hex_bytes;
pub mod varint;

pub use block_type::BlockType;
pub use error::{TypeError, VarintError};
