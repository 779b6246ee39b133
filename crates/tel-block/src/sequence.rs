use std::fmt;

use bytes::Bytes;
use tel_types::{varint, BlockType, TypeError};

use crate::block::Block;
use crate::error::{BlockError, BlockResult};

/// Outer-to-innermost nesting shape of a block.
///
/// Policies list allowed shapes in their raw form, the concatenated varint
/// tags; two shapes match only when the sequences are identical.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockTypeSequence(Vec<BlockType>);

impl BlockTypeSequence {
    pub fn from_types(types: impl IntoIterator<Item = BlockType>) -> Self {
        Self(types.into_iter().collect())
    }

    pub fn from_block(block: &Block) -> Self {
        Self(block.layers().map(Block::block_type).collect())
    }

    /// Decode concatenated varint tags.
    pub fn from_raw_bytes(raw: &[u8]) -> BlockResult<Self> {
        let mut types = Vec::new();
        let mut offset = 0;
        while offset < raw.len() {
            let (tag, used) = varint::decode_u64(&raw[offset..])
                .map_err(|source| BlockError::Sequence(TypeError::Varint(source)))?;
            types.push(BlockType::from_tag(tag).map_err(BlockError::Sequence)?);
            offset += used;
        }
        Ok(Self(types))
    }

    pub fn to_raw_bytes(&self) -> Bytes {
        let mut out = Vec::with_capacity(self.0.len());
        for block_type in &self.0 {
            varint::encode_u64(&mut out, block_type.tag());
        }
        Bytes::from(out)
    }

    pub fn types(&self) -> &[BlockType] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for BlockTypeSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, block_type) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(">")?;
            }
            write!(f, "{block_type}")?;
        }
        Ok(())
    }
}

impl FromIterator<BlockType> for BlockTypeSequence {
    fn from_iter<I: IntoIterator<Item = BlockType>>(iter: I) -> Self {
        Self::from_types(iter)
    }
}
