use bytes::Bytes;
use tel_types::BlockType;

use crate::error::BlockResult;
use crate::reader::{self, ReadOptions};
use crate::sequence::BlockTypeSequence;

/// A parsed block.
///
/// Blocks are immutable: they are either parsed once from bytes or produced
/// by parsing a [`crate::BlockBuilder`]'s output. Every block keeps its own
/// raw encoding; payload fields are zero-copy views into it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    raw: Bytes,
    body: BlockBody,
}

/// Variant fields of a block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockBody {
    /// Ledger policy; only valid as the genesis block.
    Policy { version: u64, policy: Bytes },
    /// Opaque application payload.
    Data { data: Bytes },
    /// Hashes of content stored elsewhere.
    Reference { hashes: Vec<Bytes> },
    /// Public keys of new authors.
    AddAuthors { author_keys: Vec<Bytes> },
    /// Acknowledges the block at `target_index` by its link hash.
    Ack {
        target_index: u64,
        target_link_hash: Bytes,
    },
    /// Inner block signed by a known author.
    AuthorSignature {
        author_id: Bytes,
        inner: Box<Block>,
        signature: Bytes,
    },
    /// Binds the inner block to the current head block hash.
    PreviousBlock {
        previous_block_hash: Bytes,
        inner: Box<Block>,
    },
    /// Binds the inner block to the current context link hash.
    InContext {
        context_link_hash: Bytes,
        inner: Box<Block>,
    },
    /// Publishes this block's link hash as the new context on acceptance.
    UpdateContext { inner: Box<Block> },
}

impl Block {
    /// Parse a block with the default nesting limit.
    pub fn parse(raw: impl Into<Bytes>) -> BlockResult<Self> {
        Self::parse_with(raw, ReadOptions::default())
    }

    /// Parse a block with explicit reader options.
    pub fn parse_with(raw: impl Into<Bytes>, options: ReadOptions) -> BlockResult<Self> {
        reader::read_block(raw.into(), options)
    }

    pub(crate) fn from_parts(raw: Bytes, body: BlockBody) -> Self {
        Self { raw, body }
    }

    /// The exact bytes this block was parsed from.
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    /// Encoded size in bytes.
    pub fn raw_len(&self) -> usize {
        self.raw.len()
    }

    pub fn body(&self) -> &BlockBody {
        &self.body
    }

    pub fn block_type(&self) -> BlockType {
        match &self.body {
            BlockBody::Policy { .. } => BlockType::Policy,
            BlockBody::Data { .. } => BlockType::Data,
            BlockBody::Reference { .. } => BlockType::Reference,
            BlockBody::AddAuthors { .. } => BlockType::AddAuthors,
            BlockBody::Ack { .. } => BlockType::Ack,
            BlockBody::AuthorSignature { .. } => BlockType::AuthorSignature,
            BlockBody::PreviousBlock { .. } => BlockType::PreviousBlock,
            BlockBody::InContext { .. } => BlockType::InContext,
            BlockBody::UpdateContext { .. } => BlockType::UpdateContext,
        }
    }

    /// The wrapped block, for encapsulations.
    pub fn inner(&self) -> Option<&Block> {
        match &self.body {
            BlockBody::AuthorSignature { inner, .. }
            | BlockBody::PreviousBlock { inner, .. }
            | BlockBody::InContext { inner, .. }
            | BlockBody::UpdateContext { inner } => Some(inner),
            BlockBody::Policy { .. }
            | BlockBody::Data { .. }
            | BlockBody::Reference { .. }
            | BlockBody::AddAuthors { .. }
            | BlockBody::Ack { .. } => None,
        }
    }

    /// The terminal block at the bottom of the encapsulation chain.
    pub fn innermost(&self) -> &Block {
        self.layers().last().unwrap_or(self)
    }

    /// This block followed by every nested block, outermost first.
    pub fn layers(&self) -> Layers<'_> {
        Layers { next: Some(self) }
    }

    /// Number of nesting levels, counting this block.
    pub fn depth(&self) -> usize {
        self.layers().count()
    }

    /// Full outer-to-innermost nesting shape.
    pub fn type_sequence(&self) -> BlockTypeSequence {
        BlockTypeSequence::from_block(self)
    }
}

/// Iterator over a block and its nested blocks.
#[derive(Clone, Debug)]
pub struct Layers<'a> {
    next: Option<&'a Block>,
}

impl<'a> Iterator for Layers<'a> {
    type Item = &'a Block;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.inner();
        Some(current)
    }
}
